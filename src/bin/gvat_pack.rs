//! Bundle annotation stream files into a validation package.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use gvat::format::package::write_package_file;
use gvat::format::stream::decode_file;
use gvat::util::{collect_files, file_stem};

#[derive(Parser, Debug)]
#[command(
    name = "gvat-pack",
    about = "Pack annotation streams into a validation package",
    version
)]
struct Args {
    /// Root folder to scan for .stream files.
    root: PathBuf,

    /// Output package path.
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let files = collect_files(&args.root, "stream")
        .with_context(|| format!("cannot scan {:?}", args.root))?;

    let mut entries = Vec::with_capacity(files.len());
    for path in &files {
        let bytes =
            std::fs::read(path).with_context(|| format!("open failed: {}", path.display()))?;
        // Decoding up front keeps corrupt streams out of the package.
        let (anno, _history) =
            decode_file(&bytes).with_context(|| format!("stream is bad: {}", path.display()))?;
        entries.push((file_stem(path), anno));
    }

    write_package_file(&args.output, &entries)
        .with_context(|| format!("cannot write {:?}", args.output))?;
    println!("packed {} streams into {:?}", entries.len(), args.output);

    Ok(())
}
