//! Input-path list files for the packer (`-f LIST`).

use std::fs;
use std::io;
use std::path::Path;

/// Reads a list file: one path per line, CR/LF trimmed, blank lines skipped.
pub fn read_list_file(path: &Path) -> io::Result<Vec<String>> {
    let contents = fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}
