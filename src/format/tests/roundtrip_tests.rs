//! Round-trip and version-gate tests for the binary stream codec.

use crate::format::stream::{
    decode_annotation, decode_file, decode_history, decode_legacy_file, encode_annotation,
    encode_file, encode_history, FORMAT_VERSION, LEGACY_FORMAT_VERSION,
};
use crate::format::StreamError;
use crate::model::{
    BlockHelper, CharacterAnnotation, HelperEvent, ImageAnnotation, Point, Polygon,
};

fn start(x: f64, y: f64) -> HelperEvent {
    HelperEvent::Start {
        pos: Point::new(x, y),
        regular: false,
    }
}

/// An annotation exercising every field: committed characters with props,
/// a block mid-construction with a live stroke, and a moved focus point.
fn comprehensive_annotation() -> ImageAnnotation {
    let mut anno = ImageAnnotation::new();
    anno.apply(start(0.0, 0.0));
    anno.apply(start(100.0, 0.0));
    anno.apply(start(100.0, 40.0));
    anno.apply(start(0.0, 40.0));
    anno.apply(start(10.0, 20.0));
    anno.apply(start(40.0, 20.0));
    anno.apply(start(50.0, 20.0));
    anno.apply(start(80.0, 20.0));
    anno.input_text(0, "中国");
    anno.blocks[0].characters[0].props.insert("covered".into(), 1);
    anno.blocks[0].characters[1].props.insert("pass".into(), 1);
    // Leave the fresh block with a half-built frame and a live stroke
    // preview to cover the transient helper fields.
    anno.apply(start(0.0, 100.0));
    anno.apply(HelperEvent::Pending {
        pos: Point::new(60.0, 104.0),
        regular: false,
    });
    anno
}

#[test]
fn test_annotation_value_roundtrip() {
    let anno = comprehensive_annotation();
    let bytes = encode_annotation(&anno);
    let decoded = decode_annotation(&bytes).unwrap();
    assert_eq!(decoded, anno);
}

#[test]
fn test_annotation_byte_roundtrip() {
    // encode(decode(bytes)) == bytes, transient helper state included.
    let bytes = encode_annotation(&comprehensive_annotation());
    let reencoded = encode_annotation(&decode_annotation(&bytes).unwrap());
    assert_eq!(reencoded, bytes);
}

#[test]
fn test_empty_annotation_roundtrip() {
    let anno = ImageAnnotation::new();
    let decoded = decode_annotation(&encode_annotation(&anno)).unwrap();
    assert_eq!(decoded, anno);
    assert_eq!(decoded.blocks.len(), 1);
}

#[test]
fn test_helperless_block_roundtrip() {
    let mut anno = ImageAnnotation::new();
    anno.blocks[0].helper = BlockHelper::None;
    anno.blocks[0]
        .characters
        .push(CharacterAnnotation::new(Polygon::from(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ])));
    let decoded = decode_annotation(&encode_annotation(&anno)).unwrap();
    assert_eq!(decoded, anno);
}

#[test]
fn test_version_gate_rejects_every_other_version() {
    let mut bytes = encode_annotation(&ImageAnnotation::new());
    for version in [0x1000u32, LEGACY_FORMAT_VERSION, 0x1003, 0, u32::MAX] {
        bytes[..4].copy_from_slice(&version.to_be_bytes());
        match decode_annotation(&bytes) {
            Err(StreamError::VersionMismatch { expected, found }) => {
                assert_eq!(expected, FORMAT_VERSION);
                assert_eq!(found, version);
            }
            other => panic!("expected version mismatch, got {other:?}"),
        }
    }
}

#[test]
fn test_truncated_stream_fails() {
    let bytes = encode_annotation(&comprehensive_annotation());
    for cut in [0, 3, 4, 11, bytes.len() / 2, bytes.len() - 1] {
        assert!(
            decode_annotation(&bytes[..cut]).is_err(),
            "cut at {cut} must fail"
        );
    }
}

#[test]
fn test_trailing_bytes_fail() {
    let mut bytes = encode_annotation(&ImageAnnotation::new());
    bytes.push(0);
    assert!(matches!(
        decode_annotation(&bytes),
        Err(StreamError::TrailingBytes)
    ));
}

#[test]
fn test_invalid_helper_tag_fails() {
    let anno = ImageAnnotation::new();
    let mut bytes = encode_annotation(&anno);
    // The helper tag of the single empty block sits after version (4),
    // block count (4) and character count (4).
    bytes[12..16].copy_from_slice(&7u32.to_be_bytes());
    assert!(matches!(
        decode_annotation(&bytes),
        Err(StreamError::InvalidValue { .. })
    ));
}

#[test]
fn test_history_roundtrip_through_compression() {
    let snapshots = vec![
        ImageAnnotation::new(),
        comprehensive_annotation(),
        ImageAnnotation::new(),
    ];
    let bytes = encode_history(&snapshots).unwrap();
    let decoded = decode_history(&bytes).unwrap();
    assert_eq!(decoded, snapshots);
}

#[test]
fn test_history_compresses_repetition() {
    // Forty identical snapshots deflate to far less than their raw size.
    let snapshots = vec![comprehensive_annotation(); 40];
    let raw_size: usize = snapshots
        .iter()
        .map(|s| encode_annotation(s).len())
        .sum();
    let compressed = encode_history(&snapshots).unwrap();
    assert!(compressed.len() * 4 < raw_size);
}

#[test]
fn test_file_roundtrip_with_history() {
    let anno = comprehensive_annotation();
    let history = vec![ImageAnnotation::new(), anno.clone()];
    let bytes = encode_file(&anno, &history).unwrap();
    let (decoded_anno, decoded_history) = decode_file(&bytes).unwrap();
    assert_eq!(decoded_anno, anno);
    assert_eq!(decoded_history, history);
}

#[test]
fn test_annotation_only_file_has_empty_history() {
    let anno = comprehensive_annotation();
    let bytes = encode_annotation(&anno);
    let (decoded, history) = decode_file(&bytes).unwrap();
    assert_eq!(decoded, anno);
    assert!(history.is_empty());
}

#[test]
fn test_corrupt_history_section_fails() {
    let mut bytes = encode_annotation(&ImageAnnotation::new());
    bytes.extend_from_slice(b"garbage after the annotation");
    assert!(decode_file(&bytes).is_err());
}

/// Hand-build a legacy (0x1001) file: same annotation schema with the old
/// version tag, history uncompressed.
fn legacy_file(anno: &ImageAnnotation, history: &[ImageAnnotation]) -> Vec<u8> {
    fn retag(mut bytes: Vec<u8>) -> Vec<u8> {
        bytes[..4].copy_from_slice(&LEGACY_FORMAT_VERSION.to_be_bytes());
        bytes
    }
    let mut out = retag(encode_annotation(anno));
    out.extend_from_slice(&(history.len() as u32).to_be_bytes());
    for snapshot in history {
        out.extend_from_slice(&retag(encode_annotation(snapshot)));
    }
    out
}

#[test]
fn test_legacy_decode_accepts_exactly_1001() {
    let anno = comprehensive_annotation();
    let history = vec![ImageAnnotation::new(), anno.clone()];
    let bytes = legacy_file(&anno, &history);
    let (decoded, decoded_history) = decode_legacy_file(&bytes).unwrap();
    assert_eq!(decoded, anno);
    assert_eq!(decoded_history, history);

    // The live decoder must refuse the legacy stream...
    assert!(matches!(
        decode_file(&bytes),
        Err(StreamError::VersionMismatch { .. })
    ));
    // ...and the legacy decoder must refuse a current stream.
    let current = encode_annotation(&anno);
    assert!(matches!(
        decode_legacy_file(&current),
        Err(StreamError::VersionMismatch { .. })
    ));
}

#[test]
fn test_migration_reencodes_as_current() {
    let anno = comprehensive_annotation();
    let history = vec![anno.clone()];
    let legacy = legacy_file(&anno, &history);
    let (decoded, decoded_history) = decode_legacy_file(&legacy).unwrap();
    let migrated = encode_file(&decoded, &decoded_history).unwrap();
    let (reread, reread_history) = decode_file(&migrated).unwrap();
    assert_eq!(reread, anno);
    assert_eq!(reread_history, history);
}
