//! JSON projection of annotation stream files.
//!
//! Walks a directory recursively and prints one flattened JSON record per
//! image on stdout, suitable for downstream training pipelines. The
//! projection is lossy: construction state is dropped, masked and illegible
//! characters move to the ignore list.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use gvat::format::json_export::image_record;
use gvat::format::stream::decode_file;
use gvat::model::ImageAnnotation;
use gvat::util::{collect_files, file_stem};

#[derive(Parser, Debug)]
#[command(
    name = "gvat-export",
    about = "Export annotation streams as JSON records",
    version
)]
struct Args {
    /// Root folder to scan for .stream files.
    root: PathBuf,
}

/// Labeled boxes must be resolved quadrilaterals; anything with more than
/// one glyph of text is demoted to an illegible marker.
fn sanitize(anno: &mut ImageAnnotation, name: &str) -> Result<()> {
    for block in &mut anno.blocks {
        for character in &mut block.characters {
            if !character.has_text() {
                continue;
            }
            if character.polygon.len() != 4 {
                bail!("polygon size != 4 in {name}");
            }
            if character.text.chars().count() > 1 {
                log::warn!(
                    "multi-glyph text {:?} in {name}, treating as illegible",
                    character.text
                );
                character.text = "*".to_string();
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let files = collect_files(&args.root, "stream")
        .with_context(|| format!("cannot scan {:?}", args.root))?;

    let mut exported = 0usize;
    for path in &files {
        let bytes =
            std::fs::read(path).with_context(|| format!("open failed: {}", path.display()))?;
        let (mut anno, _history) =
            decode_file(&bytes).with_context(|| format!("stream is bad: {}", path.display()))?;
        let image_id = file_stem(path);
        sanitize(&mut anno, &image_id)?;
        println!("{}", image_record(&image_id, &anno));
        exported += 1;
    }
    log::info!("exported {exported} of {} stream files", files.len());

    Ok(())
}
