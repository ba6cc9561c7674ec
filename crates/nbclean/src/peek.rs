//! Quick look at the head of a data file.

use crate::error::{NotebookError, Result};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Lines shown by default (one more is printed, then `...`)
pub const DEFAULT_LINES: usize = 10;

/// Columns shown per line by default
pub const DEFAULT_COLUMNS: usize = 80;

/// Print the first `lines + 1` lines of `path` to `out`, each cut to
/// `columns` characters with ` ...` marking a cut, then `...` if the file
/// goes on. Invalid UTF-8 is replaced, not rejected.
///
/// # Errors
///
/// Returns an error if the file cannot be read or `out` cannot be written.
pub fn peek<W: Write>(path: &Path, lines: usize, columns: usize, out: &mut W) -> Result<()> {
    let file = std::fs::File::open(path).map_err(|e| NotebookError::io(path, e))?;
    let reader = BufReader::new(file);
    let write_err = |e: std::io::Error| NotebookError::io("<output>", e);

    for (index, raw) in reader.split(b'\n').enumerate() {
        let raw = raw.map_err(|e| NotebookError::io(path, e))?;
        if index > lines {
            writeln!(out, "...").map_err(write_err)?;
            break;
        }
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim_end();
        let shown: String = line.chars().take(columns).collect();
        if line.chars().count() > columns {
            writeln!(out, "{shown} ...").map_err(write_err)?;
        } else {
            writeln!(out, "{shown}").map_err(write_err)?;
        }
    }
    Ok(())
}
