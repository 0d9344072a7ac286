//! Small filesystem helpers shared by the batch tools.

use std::io;
use std::path::{Path, PathBuf};

/// Recursively collect files with the given extension, sorted by path for
/// stable batch output.
pub fn collect_files(dir: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
    fn visit(dir: &Path, extension: &str, out: &mut Vec<PathBuf>) -> io::Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                visit(&path, extension, out)?;
            } else if path.extension().and_then(|e| e.to_str()) == Some(extension) {
                out.push(path);
            }
        }
        Ok(())
    }
    let mut files = Vec::new();
    visit(dir, extension, &mut files)?;
    files.sort();
    Ok(files)
}

/// Base name of a file without its extension.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}
