//! One-way JSON projection of annotation data.
//!
//! Batch consumers downstream of the editor (training pipelines, progress
//! dashboards) take flattened JSON records rather than the binary stream.
//! The projection is lossy by design: it keeps labeled character boxes and
//! ignore regions, and drops the in-progress construction state.

use serde::Serialize;
use serde_json::{json, Value};

use crate::model::{CharacterAnnotation, ImageAnnotation, Polygon};

/// Export vocabulary for character property flags, in wire order. The
/// left-hand names are the editor's property keys, the right-hand names the
/// dataset vocabulary.
const ATTRIBUTE_EXPORT_NAMES: &[(&str, &str)] = &[
    ("covered", "occluded"),
    ("bgcomplex", "bgcomplex"),
    ("raised", "distorted"),
    ("perspective", "raised"),
    ("wordart", "wordart"),
    ("handwritten", "handwritten"),
];

/// Per-image count summary, as reported by the validation and counting
/// tools. Only characters that carry text are counted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageSummary {
    #[serde(rename = "numBlock")]
    pub num_block: usize,
    #[serde(rename = "numCharacter")]
    pub num_character: usize,
    #[serde(rename = "numCharInBlock")]
    pub num_char_in_block: Vec<usize>,
}

/// Count labeled characters per block and collect them in order.
pub fn summarize(anno: &ImageAnnotation) -> (ImageSummary, Vec<CharacterAnnotation>) {
    let mut summary = ImageSummary::default();
    let mut labeled = Vec::new();
    for block in &anno.blocks {
        let mut count = 0;
        for character in &block.characters {
            if !character.has_text() {
                continue;
            }
            count += 1;
            labeled.push(character.clone());
        }
        if count > 0 {
            summary.num_block += 1;
            summary.num_character += count;
            summary.num_char_in_block.push(count);
        }
    }
    (summary, labeled)
}

/// A polygon as a JSON array of `[x, y]` pairs.
pub fn polygon_value(polygon: &Polygon) -> Value {
    Value::Array(
        polygon
            .points
            .iter()
            .map(|p| json!([p.x, p.y]))
            .collect(),
    )
}

/// Axis-aligned bounding box as `[x, y, width, height]`.
pub fn bbox_value(polygon: &Polygon) -> Value {
    match polygon.bounding_box() {
        Some(b) => json!([b.x, b.y, b.width, b.height]),
        None => json!([0, 0, 0, 0]),
    }
}

/// Bounding box of the polygon's edge third-points: a crop-tolerant box that
/// shaves the corners off a strongly sheared quadrilateral.
pub fn adjusted_bbox_value(polygon: &Polygon) -> Value {
    let points = &polygon.points;
    if points.is_empty() {
        return json!([0, 0, 0, 0]);
    }
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    let n = points.len();
    for i in 0..n {
        let p1 = points[i];
        let p2 = points[(i + 1) % n];
        for j in 1..3 {
            let t = j as f64 / 3.0;
            let q = p1 * t + p2 * (1.0 - t);
            min_x = min_x.min(q.x);
            max_x = max_x.max(q.x);
            min_y = min_y.min(q.y);
            max_y = max_y.max(q.y);
        }
    }
    json!([min_x, min_y, max_x - min_x, max_y - min_y])
}

/// Whether a single-glyph text is a CJK unified ideograph.
pub fn is_chinese(text: &str) -> bool {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => ('\u{4e00}'..='\u{9fff}').contains(&c),
        _ => false,
    }
}

/// Flattened record for one labeled character.
pub fn character_record(character: &CharacterAnnotation) -> Value {
    let mut attributes: Vec<&str> = ATTRIBUTE_EXPORT_NAMES
        .iter()
        .filter(|(key, _)| character.props.get(*key).copied() == Some(1))
        .map(|(_, name)| *name)
        .collect();
    attributes.sort_unstable();
    json!({
        "polygon": polygon_value(&character.polygon),
        "adjusted_bbox": adjusted_bbox_value(&character.polygon),
        "text": character.text,
        "is_chinese": is_chinese(&character.text),
        "attributes": attributes,
    })
}

/// Record for one ignore region (mask or illegible glyph).
pub fn ignore_record(character: &CharacterAnnotation) -> Value {
    json!({
        "polygon": polygon_value(&character.polygon),
        "bbox": bbox_value(&character.polygon),
    })
}

/// Flattened record for one image: per-block arrays of labeled characters
/// plus the ignore regions.
pub fn image_record(image_id: &str, anno: &ImageAnnotation) -> Value {
    let mut blocks = Vec::new();
    let mut ignore = Vec::new();
    for block in &anno.blocks {
        let mut records = Vec::new();
        for character in &block.characters {
            if character.is_masked() || character.is_illegible() {
                ignore.push(ignore_record(character));
            } else if character.has_text() {
                records.push(character_record(character));
            }
        }
        if !records.is_empty() {
            blocks.push(Value::Array(records));
        }
    }
    json!({
        "image_id": image_id,
        "annotations": blocks,
        "ignore": ignore,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Point;

    fn character(x: f64, text: &str) -> CharacterAnnotation {
        CharacterAnnotation::new(Polygon::from(vec![
            Point::new(x, 0.0),
            Point::new(x + 10.0, 0.0),
            Point::new(x + 10.0, 10.0),
            Point::new(x, 10.0),
        ]))
        .with_text(text)
    }

    fn sample_image() -> ImageAnnotation {
        let mut anno = ImageAnnotation::new();
        anno.blocks[0].characters.push(character(0.0, "中"));
        anno.blocks[0].characters.push(character(10.0, "国"));
        anno.new_block();
        anno.blocks[1].characters.push(character(0.0, ""));
        anno
    }

    #[test]
    fn test_summarize_counts_labeled_only() {
        let (summary, labeled) = summarize(&sample_image());
        assert_eq!(summary.num_block, 1);
        assert_eq!(summary.num_character, 2);
        assert_eq!(summary.num_char_in_block, vec![2]);
        assert_eq!(labeled.len(), 2);
    }

    #[test]
    fn test_is_chinese() {
        assert!(is_chinese("中"));
        assert!(!is_chinese("A"));
        assert!(!is_chinese("*"));
        assert!(!is_chinese("中国"));
        assert!(!is_chinese(""));
    }

    #[test]
    fn test_character_record_attributes() {
        let character = character(0.0, "中")
            .with_prop("covered", 1)
            .with_prop("perspective", 1)
            .with_prop("wordart", 0);
        let record = character_record(&character);
        assert_eq!(record["text"], "中");
        assert_eq!(record["is_chinese"], true);
        // covered exports as occluded, perspective as raised; unset flags
        // are dropped; order is sorted.
        assert_eq!(record["attributes"], json!(["occluded", "raised"]));
        assert_eq!(record["polygon"][0], json!([0.0, 0.0]));
    }

    #[test]
    fn test_adjusted_bbox_shrinks_square() {
        let poly = Polygon::from(vec![
            Point::new(0.0, 0.0),
            Point::new(3.0, 0.0),
            Point::new(3.0, 3.0),
            Point::new(0.0, 3.0),
        ]);
        // Edge third-points keep the full extent along each edge, so for an
        // axis-aligned square the adjusted box equals the plain box.
        assert_eq!(adjusted_bbox_value(&poly), json!([0.0, 0.0, 3.0, 3.0]));
    }

    #[test]
    fn test_adjusted_bbox_shaves_diamond_tips() {
        let poly = Polygon::from(vec![
            Point::new(3.0, 0.0),
            Point::new(6.0, 3.0),
            Point::new(3.0, 6.0),
            Point::new(0.0, 3.0),
        ]);
        let value = adjusted_bbox_value(&poly);
        let bbox: Vec<f64> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect();
        assert!(bbox[0] > 0.0 && bbox[2] < 6.0);
    }

    #[test]
    fn test_image_record_routes_masks_to_ignore() {
        let mut anno = ImageAnnotation::new();
        anno.blocks[0].characters.push(character(0.0, "中"));
        anno.blocks[0].characters.push(character(10.0, "国"));
        anno.new_block();
        anno.blocks[1].characters.push(character(50.0, "x"));
        anno.mask_block(1);
        let record = image_record("img-001", &anno);
        assert_eq!(record["image_id"], "img-001");
        assert_eq!(record["annotations"].as_array().unwrap().len(), 1);
        assert_eq!(record["annotations"][0].as_array().unwrap().len(), 2);
        assert_eq!(record["ignore"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_empty_polygon_bboxes() {
        let empty = Polygon::new();
        assert_eq!(bbox_value(&empty), json!([0, 0, 0, 0]));
        assert_eq!(adjusted_bbox_value(&empty), json!([0, 0, 0, 0]));
    }
}
