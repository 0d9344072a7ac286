//! Offline migration of legacy annotation stream files.
//!
//! Decodes files written under the previous format revision (version tag
//! 0x1001, uncompressed history) and re-encodes them as the current format.
//! The live decoder never accepts more than one version; this tool is the
//! only cross-version path.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use gvat::format::stream::{decode_legacy_file, encode_file};
use gvat::util::collect_files;

#[derive(Parser, Debug)]
#[command(
    name = "gvat-migrate",
    about = "Migrate legacy annotation streams to the current format",
    version
)]
struct Args {
    /// Folder holding legacy .stream files.
    input: PathBuf,

    /// Folder to write migrated files into (tree structure is preserved).
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let files = collect_files(&args.input, "stream")
        .with_context(|| format!("cannot scan {:?}", args.input))?;

    for path in &files {
        log::info!("migrating {}", path.display());
        let bytes =
            std::fs::read(path).with_context(|| format!("open failed: {}", path.display()))?;
        let (anno, history) = decode_legacy_file(&bytes)
            .with_context(|| format!("stream is bad: {}", path.display()))?;

        let relative = path
            .strip_prefix(&args.input)
            .with_context(|| format!("path outside input tree: {}", path.display()))?;
        let target = args.output.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let migrated = encode_file(&anno, &history)?;
        std::fs::write(&target, migrated)
            .with_context(|| format!("cannot write {}", target.display()))?;
    }
    println!("migrated {} files", files.len());

    Ok(())
}
