//! Character statistics over a tree of annotation stream files.
//!
//! Walks a directory recursively, decodes every `.stream` file and prints
//! per-file, per-folder and total block/character counts, followed by a
//! glyph frequency table.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use gvat::format::json_export::summarize;
use gvat::format::stream::decode_file;
use gvat::util::{collect_files, file_stem};

#[derive(Parser, Debug)]
#[command(
    name = "gvat-count",
    about = "Count annotated blocks and characters",
    version
)]
struct Args {
    /// Root folder to scan for .stream files.
    root: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let files = collect_files(&args.root, "stream")
        .with_context(|| format!("cannot scan {:?}", args.root))?;

    println!(
        "{:>5} {:>10} {:>6} {:>6}  {}",
        "#", "ID", "#Blk", "#Char", "Folder"
    );

    let mut bucket: BTreeMap<String, u64> = BTreeMap::new();
    let mut folder_counts: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    let mut total_blocks = 0;
    let mut total_characters = 0;

    for (index, path) in files.iter().enumerate() {
        let bytes =
            std::fs::read(path).with_context(|| format!("open failed: {}", path.display()))?;
        let (anno, _history) =
            decode_file(&bytes).with_context(|| format!("stream is bad: {}", path.display()))?;

        let (summary, labeled) = summarize(&anno);
        for character in &labeled {
            *bucket.entry(character.text.clone()).or_default() += 1;
        }

        let folder = path
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        println!(
            "{:>5} {:>10} {:>6} {:>6}  {}",
            index + 1,
            file_stem(path),
            summary.num_block,
            summary.num_character,
            folder
        );
        total_blocks += summary.num_block;
        total_characters += summary.num_character;
        let entry = folder_counts.entry(folder).or_default();
        entry.0 += summary.num_block;
        entry.1 += summary.num_character;
    }

    println!(
        "{:>5} {:>10} {:>6} {:>6}",
        "#", "Total", total_blocks, total_characters
    );
    for (folder, (blocks, characters)) in &folder_counts {
        println!(
            "{:>5} {:>10} {:>6} {:>6}  {}",
            "#", "sum", blocks, characters, folder
        );
    }

    // Frequency table: most frequent first, ties in glyph order.
    let mut frequencies: Vec<(&String, &u64)> = bucket.iter().collect();
    frequencies.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (glyph, count) in frequencies {
        println!("{glyph} {count}");
    }

    Ok(())
}
