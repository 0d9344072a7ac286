//! Cross validation of annotation packages.
//!
//! Compares two independently produced annotation packages (or summarizes a
//! single one) and prints exactly one JSON report object on stdout. Errors
//! are part of the report contract: `{"error": 1|2|3|4, "errorMessage": …}`
//! with no other side effects, and the exit status follows the presence of a
//! nonzero error code.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use serde_json::{json, Map, Value};

use gvat::format::json_export::{polygon_value, summarize};
use gvat::format::package::read_package_file;
use gvat::matching::{match_annotations, MatchConfig, SideReport};
use gvat::model::CharacterAnnotation;

#[derive(Parser, Debug)]
#[command(
    name = "gvat-validate",
    about = "Cross validation of annotation packages",
    version
)]
struct Args {
    /// Only validate a single package.
    #[arg(short, long)]
    single: bool,

    /// Minimum overlap ratio between polygons.
    #[arg(short, long)]
    ratio: Option<f64>,

    /// One package path with --single, two otherwise.
    packages: Vec<PathBuf>,
}

fn error_value(code: i64, message: impl Into<String>) -> Value {
    json!({ "error": code, "errorMessage": message.into() })
}

fn character_value(character: &CharacterAnnotation) -> Value {
    json!({
        "box": polygon_value(&character.polygon),
        "text": character.text,
    })
}

fn side_value(side: &SideReport) -> Value {
    let entries = |list: &[CharacterAnnotation]| -> Vec<Value> {
        list.iter().map(character_value).collect()
    };
    json!({
        "error": entries(&side.error),
        "miss": entries(&side.miss),
        "redundant": entries(&side.redundant),
    })
}

/// Load one package: per-image summaries plus the labeled characters.
#[allow(clippy::type_complexity)]
fn load_package(
    path: &Path,
) -> Result<(Map<String, Value>, BTreeMap<String, Vec<CharacterAnnotation>>), Value> {
    let package = read_package_file(path).map_err(|e| error_value(e.code(), e.to_string()))?;
    let mut images = Map::new();
    let mut characters = BTreeMap::new();
    for (image_id, anno) in package {
        let (summary, labeled) = summarize(&anno);
        images.insert(image_id.clone(), json!(summary));
        characters.insert(image_id, labeled);
    }
    Ok((images, characters))
}

fn run(args: &Args) -> Value {
    if args.single {
        let [package] = args.packages.as_slice() else {
            return error_value(1, "invalid argument");
        };
        match load_package(package) {
            Ok((images, _)) => json!({ "error": 0, "images": images }),
            Err(report) => report,
        }
    } else {
        let [left, right] = args.packages.as_slice() else {
            return error_value(1, "invalid argument");
        };
        let Some(ratio) = args.ratio else {
            return error_value(1, "missing option -r");
        };
        let (images1, characters1) = match load_package(left) {
            Ok(loaded) => loaded,
            Err(report) => return report,
        };
        let (images2, characters2) = match load_package(right) {
            Ok(loaded) => loaded,
            Err(report) => return report,
        };

        let config = MatchConfig::with_accept_ratio(ratio);
        let mut feedback1 = Map::new();
        let mut feedback2 = Map::new();
        for (image_id, left_chars) in &characters1 {
            let Some(right_chars) = characters2.get(image_id) else {
                continue;
            };
            let report = match_annotations(left_chars, right_chars, &config);
            feedback1.insert(image_id.clone(), side_value(&report.left));
            feedback2.insert(image_id.clone(), side_value(&report.right));
        }
        json!({
            "error": 0,
            "images1": images1,
            "images2": images2,
            "feedback1": feedback1,
            "feedback2": feedback2,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gvat::format::package::write_package_file;
    use gvat::model::{ImageAnnotation, Point, Polygon};

    fn args(single: bool, ratio: Option<f64>, packages: Vec<PathBuf>) -> Args {
        Args {
            single,
            ratio,
            packages,
        }
    }

    fn labeled(x: f64, text: &str) -> CharacterAnnotation {
        let polygon = Polygon::from(vec![
            Point::new(x, 0.0),
            Point::new(x + 10.0, 0.0),
            Point::new(x + 10.0, 10.0),
            Point::new(x, 10.0),
        ]);
        CharacterAnnotation::new(polygon).with_text(text)
    }

    fn annotation(texts: &[&str]) -> ImageAnnotation {
        let mut anno = ImageAnnotation::new();
        for (i, text) in texts.iter().enumerate() {
            anno.blocks[0]
                .characters
                .push(labeled(12.0 * i as f64, text));
        }
        anno
    }

    #[test]
    fn test_missing_ratio_is_argument_error() {
        let report = run(&args(false, None, vec!["a".into(), "b".into()]));
        assert_eq!(report["error"], 1);
    }

    #[test]
    fn test_wrong_package_count_is_argument_error() {
        let report = run(&args(true, None, vec![]));
        assert_eq!(report["error"], 1);
        let report = run(&args(false, Some(0.5), vec!["only-one".into()]));
        assert_eq!(report["error"], 1);
    }

    #[test]
    fn test_unreadable_package_code() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.pack");
        std::fs::write(&bad, b"not an archive").unwrap();
        let report = run(&args(true, None, vec![bad]));
        assert_eq!(report["error"], 2);
        assert!(report["errorMessage"].is_string());
    }

    #[test]
    fn test_single_package_summary() {
        let dir = tempfile::tempdir().unwrap();
        let pack = dir.path().join("one.pack");
        write_package_file(&pack, &[("img-1".into(), annotation(&["中", "国"]))]).unwrap();

        let report = run(&args(true, None, vec![pack]));
        assert_eq!(report["error"], 0);
        assert_eq!(report["images"]["img-1"]["numBlock"], 1);
        assert_eq!(report["images"]["img-1"]["numCharacter"], 2);
    }

    #[test]
    fn test_cross_validation_reports_label_error() {
        let dir = tempfile::tempdir().unwrap();
        let left = dir.path().join("left.pack");
        let right = dir.path().join("right.pack");
        write_package_file(&left, &[("img-1".into(), annotation(&["中", "国"]))]).unwrap();
        write_package_file(&right, &[("img-1".into(), annotation(&["中", "圆"]))]).unwrap();

        let report = run(&args(false, Some(0.5), vec![left, right]));
        assert_eq!(report["error"], 0);
        let feed = &report["feedback1"]["img-1"];
        assert_eq!(feed["error"].as_array().unwrap().len(), 1);
        // The error entry carries the reference side's reading.
        assert_eq!(feed["error"][0]["text"], "圆");
        assert!(feed["miss"].as_array().unwrap().is_empty());
        assert!(feed["redundant"].as_array().unwrap().is_empty());
        assert_eq!(report["feedback2"]["img-1"]["error"][0]["text"], "国");
    }

    #[test]
    fn test_images_only_in_one_package_get_no_feedback() {
        let dir = tempfile::tempdir().unwrap();
        let left = dir.path().join("left.pack");
        let right = dir.path().join("right.pack");
        write_package_file(
            &left,
            &[
                ("img-1".into(), annotation(&["中"])),
                ("img-2".into(), annotation(&["文"])),
            ],
        )
        .unwrap();
        write_package_file(&right, &[("img-1".into(), annotation(&["中"]))]).unwrap();

        let report = run(&args(false, Some(0.5), vec![left, right]));
        assert_eq!(report["error"], 0);
        // Both packages are summarized in full...
        assert_eq!(report["images1"]["img-2"]["numCharacter"], 1);
        // ...but feedback exists only for the shared image.
        assert!(report["feedback1"]["img-1"].is_object());
        assert!(report["feedback1"]["img-2"].is_null());
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(_) => {
            println!("{}", error_value(1, "invalid argument"));
            return ExitCode::from(1);
        }
    };
    let report = run(&args);
    println!("{report}");
    if report["error"].as_i64() == Some(0) {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
