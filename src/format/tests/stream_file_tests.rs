//! File-backed flows: stream files on disk and package round-trips.

use std::fs;

use crate::format::package::{read_package_file, write_package_file};
use crate::format::stream::{decode_file, encode_file};
use crate::history::{Commit, History};
use crate::model::{HelperEvent, ImageAnnotation, Point};

fn start(x: f64, y: f64) -> HelperEvent {
    HelperEvent::Start {
        pos: Point::new(x, y),
        regular: false,
    }
}

fn framed_annotation() -> ImageAnnotation {
    let mut anno = ImageAnnotation::new();
    anno.apply(start(0.0, 0.0));
    anno.apply(start(80.0, 0.0));
    anno.apply(start(80.0, 30.0));
    anno.apply(start(0.0, 30.0));
    anno
}

#[test]
fn test_stream_file_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("148.stream");

    let anno = framed_annotation();
    let mut history = History::new(ImageAnnotation::new());
    history.commit(anno.clone(), Commit::Strong);

    let bytes = encode_file(&anno, history.snapshots()).unwrap();
    fs::write(&path, &bytes).unwrap();

    let (loaded, snapshots) = decode_file(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(loaded, anno);
    let restored = History::from_snapshots(snapshots).unwrap();
    assert_eq!(restored.current(), &anno);
    assert_eq!(restored.depth(), 2);
}

#[test]
fn test_corrupt_file_keeps_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.stream");
    fs::write(&path, b"\x00\x00\x10\x02 then nonsense").unwrap();
    assert!(decode_file(&fs::read(&path).unwrap()).is_err());
}

#[test]
fn test_package_file_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("left.pack");

    let entries = vec![
        ("0000148".to_string(), framed_annotation()),
        ("0000149".to_string(), ImageAnnotation::new()),
    ];
    write_package_file(&path, &entries).unwrap();

    let images = read_package_file(&path).unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(images["0000148"], entries[0].1);
    // BTreeMap keys iterate in image-id order.
    let keys: Vec<_> = images.keys().cloned().collect();
    assert_eq!(keys, vec!["0000148", "0000149"]);
}

#[test]
fn test_missing_package_file_is_entry_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_package_file(&dir.path().join("absent.pack")).unwrap_err();
    assert_eq!(err.code(), 3);
}
