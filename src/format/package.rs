//! Validation package container.
//!
//! A package bundles the annotation streams of many images into one deflate
//! archive so two independently produced annotation sets can be shipped to
//! the cross-validation tool as single files. Each entry is named
//! `<image-id>.stream` and holds one annotation-only encoding; the in-progress
//! construction state survives, histories do not travel in packages.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::format::error::{PackageError, StreamError};
use crate::format::stream::{decode_annotation, encode_annotation};
use crate::model::ImageAnnotation;

/// File extension of one packaged annotation stream.
pub const STREAM_EXTENSION: &str = "stream";

/// Write a package of annotation streams.
pub fn write_package<W: Write + std::io::Seek>(
    writer: W,
    entries: &[(String, ImageAnnotation)],
) -> Result<(), StreamError> {
    let mut archive = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (image_id, anno) in entries {
        archive.start_file(format!("{image_id}.{STREAM_EXTENSION}"), options)?;
        archive.write_all(&encode_annotation(anno))?;
    }
    archive.finish()?;
    Ok(())
}

/// Write a package to a file on disk.
pub fn write_package_file(
    path: &Path,
    entries: &[(String, ImageAnnotation)],
) -> Result<(), StreamError> {
    let file = std::fs::File::create(path)?;
    write_package(std::io::BufWriter::new(file), entries)?;
    log::info!("wrote package with {} entries to {:?}", entries.len(), path);
    Ok(())
}

/// Read a package, keyed by image id (the entry stem).
///
/// Fails closed: any unreadable entry or undecodable stream aborts the whole
/// read with the structured error the validation report needs.
pub fn read_package<R: Read + std::io::Seek>(
    reader: R,
) -> Result<BTreeMap<String, ImageAnnotation>, PackageError> {
    let mut archive = ZipArchive::new(reader).map_err(PackageError::Container)?;
    let mut images = BTreeMap::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| PackageError::Entry {
            name: format!("#{index}"),
            message: e.to_string(),
        })?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| PackageError::Entry {
                name: name.clone(),
                message: e.to_string(),
            })?;
        let anno = decode_annotation(&bytes).map_err(|source| PackageError::Stream {
            name: name.clone(),
            source,
        })?;
        images.insert(entry_stem(&name), anno);
    }
    Ok(images)
}

/// Read a package from a file on disk.
pub fn read_package_file(path: &Path) -> Result<BTreeMap<String, ImageAnnotation>, PackageError> {
    let file = std::fs::File::open(path).map_err(|e| PackageError::Entry {
        name: path.display().to_string(),
        message: e.to_string(),
    })?;
    read_package(std::io::BufReader::new(file))
}

/// Open a package held in memory.
pub fn read_package_bytes(
    bytes: &[u8],
) -> Result<BTreeMap<String, ImageAnnotation>, PackageError> {
    read_package(Cursor::new(bytes))
}

/// Image id for an entry name: base name without the stream extension.
fn entry_stem(name: &str) -> String {
    let base = name.rsplit('/').next().unwrap_or(name);
    base.strip_suffix(&format!(".{STREAM_EXTENSION}"))
        .unwrap_or(base)
        .to_string()
}
