//! Versioned binary codec for annotation streams.
//!
//! The wire format is big-endian and strictly versioned: a decoder accepts
//! exactly one version constant and fails closed on anything else. Migrating
//! between revisions is an explicit offline step (see `gvat-migrate`), never
//! a tolerant live decoder.
//!
//! Layout:
//!
//! ```text
//! annotation  = version:u32  blocks:u32 Block*  focus:f64,f64
//! Block       = characters:u32 Character*  helper_tag:u32 [PerspectiveHelper]
//! Character   = points:u32 (f64,f64)*  text:string  props:u32 (string,i32)*
//! string      = bytes:u32 utf8*
//! helper      = num_points:u32 (f64,f64)x4 stroke:(f64,f64)x2
//!               tool_switched:u8 stroking:u8 single_character:u8
//!               direction:u32
//! ```
//!
//! The history companion is a length-prefixed sequence of full annotation
//! encodings, stored whole-stream-compressed as a single-entry deflate
//! archive. A file on disk is the annotation followed by an optional
//! history container.

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::format::error::StreamError;
use crate::model::annotation::{BlockAnnotation, BlockHelper, CharacterAnnotation};
use crate::model::geometry::{Point, Polygon, Segment};
use crate::model::helper::{PerspectiveHelper, TextDirection};
use crate::model::ImageAnnotation;

/// Version tag this build reads and writes.
pub const FORMAT_VERSION: u32 = 0x1002;

/// The previous revision, readable only by the offline migration tool. It
/// shares the annotation schema but stores its history uncompressed.
pub const LEGACY_FORMAT_VERSION: u32 = 0x1001;

/// Entry name of the compressed history container.
const HISTORY_ENTRY: &str = "history";

/// Upper bound on any length field; a corrupt stream must not drive
/// allocations.
const MAX_SEQ_LEN: u32 = 0x0100_0000;

const HELPER_TAG_NONE: u32 = 0;
const HELPER_TAG_PERSPECTIVE: u32 = 1;

// ---------------------------------------------------------------------------
// Primitive readers/writers
// ---------------------------------------------------------------------------

fn write_u8(out: &mut Vec<u8>, value: u8) {
    out.push(value);
}

fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn write_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn write_f64(out: &mut Vec<u8>, value: f64) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn write_string(out: &mut Vec<u8>, value: &str) {
    write_u32(out, value.len() as u32);
    out.extend_from_slice(value.as_bytes());
}

fn write_point(out: &mut Vec<u8>, p: Point) {
    write_f64(out, p.x);
    write_f64(out, p.y);
}

fn read_u8(r: &mut impl Read) -> Result<u8, StreamError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32(r: &mut impl Read) -> Result<u32, StreamError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_i32(r: &mut impl Read) -> Result<i32, StreamError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_be_bytes(buf))
}

fn read_f64(r: &mut impl Read) -> Result<f64, StreamError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_be_bytes(buf))
}

fn read_len(r: &mut impl Read, field: &'static str) -> Result<u32, StreamError> {
    let len = read_u32(r)?;
    if len > MAX_SEQ_LEN {
        return Err(StreamError::invalid_value(field, len));
    }
    Ok(len)
}

fn read_string(r: &mut impl Read) -> Result<String, StreamError> {
    let len = read_len(r, "string length")?;
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| StreamError::InvalidString)
}

fn read_point(r: &mut impl Read) -> Result<Point, StreamError> {
    let x = read_f64(r)?;
    let y = read_f64(r)?;
    Ok(Point::new(x, y))
}

fn read_bool(r: &mut impl Read, field: &'static str) -> Result<bool, StreamError> {
    match read_u8(r)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StreamError::invalid_value(field, other)),
    }
}

// ---------------------------------------------------------------------------
// Annotation encoding
// ---------------------------------------------------------------------------

fn write_character(out: &mut Vec<u8>, character: &CharacterAnnotation) {
    write_u32(out, character.polygon.points.len() as u32);
    for p in &character.polygon.points {
        write_point(out, *p);
    }
    write_string(out, &character.text);
    write_u32(out, character.props.len() as u32);
    for (key, value) in &character.props {
        write_string(out, key);
        write_i32(out, *value);
    }
}

fn read_character(r: &mut impl Read) -> Result<CharacterAnnotation, StreamError> {
    let num_points = read_len(r, "polygon length")?;
    let mut polygon = Polygon::new();
    for _ in 0..num_points {
        polygon.push(read_point(r)?);
    }
    let text = read_string(r)?;
    let num_props = read_len(r, "prop count")?;
    let mut character = CharacterAnnotation::new(polygon).with_text(text);
    for _ in 0..num_props {
        let key = read_string(r)?;
        let value = read_i32(r)?;
        character.props.insert(key, value);
    }
    Ok(character)
}

fn direction_tag(direction: TextDirection) -> u32 {
    match direction {
        TextDirection::Auto => 0,
        TextDirection::AlongBase => 1,
        TextDirection::AcrossBase => 2,
    }
}

fn write_helper(out: &mut Vec<u8>, helper: &PerspectiveHelper) {
    write_u32(out, helper.num_points);
    for corner in helper.corners {
        write_point(out, corner);
    }
    write_point(out, helper.stroke.p1);
    write_point(out, helper.stroke.p2);
    write_u8(out, helper.tool_switched as u8);
    write_u8(out, helper.stroking as u8);
    write_u8(out, helper.single_character as u8);
    write_u32(out, direction_tag(helper.direction));
}

fn read_helper(r: &mut impl Read) -> Result<PerspectiveHelper, StreamError> {
    let num_points = read_u32(r)?;
    if num_points > 4 {
        return Err(StreamError::invalid_value("helper num_points", num_points));
    }
    let mut corners = [Point::default(); 4];
    for corner in &mut corners {
        *corner = read_point(r)?;
    }
    let stroke = Segment::new(read_point(r)?, read_point(r)?);
    let tool_switched = read_bool(r, "tool_switched flag")?;
    let stroking = read_bool(r, "stroking flag")?;
    let single_character = read_bool(r, "single_character flag")?;
    let direction = match read_u32(r)? {
        0 => TextDirection::Auto,
        1 => TextDirection::AlongBase,
        2 => TextDirection::AcrossBase,
        other => return Err(StreamError::invalid_value("direction tag", other)),
    };
    Ok(PerspectiveHelper {
        num_points,
        corners,
        stroke,
        tool_switched,
        stroking,
        single_character,
        direction,
    })
}

fn write_block(out: &mut Vec<u8>, block: &BlockAnnotation) {
    write_u32(out, block.characters.len() as u32);
    for character in &block.characters {
        write_character(out, character);
    }
    match &block.helper {
        BlockHelper::None => write_u32(out, HELPER_TAG_NONE),
        BlockHelper::Perspective(helper) => {
            write_u32(out, HELPER_TAG_PERSPECTIVE);
            write_helper(out, helper);
        }
    }
}

fn read_block(r: &mut impl Read) -> Result<BlockAnnotation, StreamError> {
    let num_characters = read_len(r, "character count")?;
    let mut characters = Vec::with_capacity(num_characters.min(1024) as usize);
    for _ in 0..num_characters {
        characters.push(read_character(r)?);
    }
    let helper = match read_u32(r)? {
        HELPER_TAG_NONE => BlockHelper::None,
        HELPER_TAG_PERSPECTIVE => BlockHelper::Perspective(read_helper(r)?),
        other => return Err(StreamError::invalid_value("helper tag", other)),
    };
    Ok(BlockAnnotation { characters, helper })
}

fn write_annotation_versioned(out: &mut Vec<u8>, anno: &ImageAnnotation, version: u32) {
    write_u32(out, version);
    write_u32(out, anno.blocks.len() as u32);
    for block in &anno.blocks {
        write_block(out, block);
    }
    write_point(out, anno.focus_point);
}

fn read_annotation_versioned(
    r: &mut impl Read,
    expected_version: u32,
) -> Result<ImageAnnotation, StreamError> {
    let version = read_u32(r)?;
    if version != expected_version {
        return Err(StreamError::VersionMismatch {
            expected: expected_version,
            found: version,
        });
    }
    let num_blocks = read_len(r, "block count")?;
    let mut blocks = Vec::with_capacity(num_blocks.min(1024) as usize);
    for _ in 0..num_blocks {
        blocks.push(read_block(r)?);
    }
    let focus_point = read_point(r)?;
    Ok(ImageAnnotation {
        blocks,
        focus_point,
    })
}

/// Encode one annotation as a standalone stream.
pub fn encode_annotation(anno: &ImageAnnotation) -> Vec<u8> {
    let mut out = Vec::new();
    write_annotation_versioned(&mut out, anno, FORMAT_VERSION);
    out
}

/// Read one annotation from a reader, leaving the reader positioned after
/// it.
pub fn read_annotation(r: &mut impl Read) -> Result<ImageAnnotation, StreamError> {
    read_annotation_versioned(r, FORMAT_VERSION)
}

/// Decode a standalone annotation stream. Trailing bytes are an error.
pub fn decode_annotation(bytes: &[u8]) -> Result<ImageAnnotation, StreamError> {
    let mut cursor = Cursor::new(bytes);
    let anno = read_annotation(&mut cursor)?;
    if cursor.position() != bytes.len() as u64 {
        return Err(StreamError::TrailingBytes);
    }
    Ok(anno)
}

// ---------------------------------------------------------------------------
// History stream
// ---------------------------------------------------------------------------

fn encode_snapshots(snapshots: &[ImageAnnotation], version: u32) -> Vec<u8> {
    let mut out = Vec::new();
    write_u32(&mut out, snapshots.len() as u32);
    for snapshot in snapshots {
        write_annotation_versioned(&mut out, snapshot, version);
    }
    out
}

fn read_snapshots(
    r: &mut impl Read,
    version: u32,
) -> Result<Vec<ImageAnnotation>, StreamError> {
    let count = read_len(r, "snapshot count")?;
    let mut snapshots = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        snapshots.push(read_annotation_versioned(r, version)?);
    }
    Ok(snapshots)
}

/// Encode a snapshot sequence as a compressed history container.
pub fn encode_history(snapshots: &[ImageAnnotation]) -> Result<Vec<u8>, StreamError> {
    let raw = encode_snapshots(snapshots, FORMAT_VERSION);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.start_file(HISTORY_ENTRY, options)?;
    writer.write_all(&raw)?;
    Ok(writer.finish()?.into_inner())
}

/// Decode a compressed history container.
pub fn decode_history(bytes: &[u8]) -> Result<Vec<ImageAnnotation>, StreamError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut raw = Vec::new();
    archive.by_name(HISTORY_ENTRY)?.read_to_end(&mut raw)?;
    let mut cursor = Cursor::new(raw.as_slice());
    let snapshots = read_snapshots(&mut cursor, FORMAT_VERSION)?;
    if cursor.position() != raw.len() as u64 {
        return Err(StreamError::TrailingBytes);
    }
    Ok(snapshots)
}

// ---------------------------------------------------------------------------
// Whole files
// ---------------------------------------------------------------------------

/// Encode an annotation together with its history companion.
pub fn encode_file(
    anno: &ImageAnnotation,
    history: &[ImageAnnotation],
) -> Result<Vec<u8>, StreamError> {
    let mut out = encode_annotation(anno);
    out.extend_from_slice(&encode_history(history)?);
    Ok(out)
}

/// Decode a file: the annotation plus its history snapshots. Annotation-only
/// streams (from the batch pipeline) yield an empty history.
pub fn decode_file(bytes: &[u8]) -> Result<(ImageAnnotation, Vec<ImageAnnotation>), StreamError> {
    let mut cursor = Cursor::new(bytes);
    let anno = read_annotation(&mut cursor)?;
    let offset = cursor.position() as usize;
    if offset == bytes.len() {
        return Ok((anno, Vec::new()));
    }
    let history = decode_history(&bytes[offset..])?;
    Ok((anno, history))
}

/// Decode a file written by the previous format revision: the same
/// annotation schema under the legacy version tag, with the history stored
/// uncompressed. Only the offline migration tool calls this.
pub fn decode_legacy_file(
    bytes: &[u8],
) -> Result<(ImageAnnotation, Vec<ImageAnnotation>), StreamError> {
    let mut cursor = Cursor::new(bytes);
    let anno = read_annotation_versioned(&mut cursor, LEGACY_FORMAT_VERSION)?;
    if cursor.position() == bytes.len() as u64 {
        return Ok((anno, Vec::new()));
    }
    let history = read_snapshots(&mut cursor, LEGACY_FORMAT_VERSION)?;
    if cursor.position() != bytes.len() as u64 {
        return Err(StreamError::TrailingBytes);
    }
    Ok((anno, history))
}
