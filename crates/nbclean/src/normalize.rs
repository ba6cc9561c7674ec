//! Commit-time notebook normalization.
//!
//! Strips execution state and editor metadata so that notebooks only change
//! in version control when their content changes. A file is rewritten only
//! when normalization actually changed something, which makes the operation
//! idempotent on disk: a second run is a no-op.

use crate::constants::{CANONICAL_DISPLAY_NAME, PRETTY_INDENT, SOLUTION_MARKER};
use crate::error::{NotebookError, Result};
use crate::ipynb::{parse_notebook, NotebookDocument};
use crate::persist::write_atomically;
use crate::rules::{
    drop_language_version, normalize_cell_metadata, normalize_kernel_display_name,
    reset_execution_state,
};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Options for the normalizer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizeOptions {
    /// Kernel display name to enforce
    pub display_name: String,
    /// The one cell metadata key that survives normalization
    pub marker: String,
    /// Spaces per nesting level in the rewritten file
    pub indent: usize,
    /// Report what would change without writing anything
    pub check_only: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            display_name: CANONICAL_DISPLAY_NAME.to_string(),
            marker: SOLUTION_MARKER.to_string(),
            indent: PRETTY_INDENT,
            check_only: false,
        }
    }
}

/// What happened to one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormalizeOutcome {
    /// Already normalized; the file was not touched
    Unchanged,
    /// Normalized and written back
    Rewritten,
    /// Needs normalizing, but `check_only` prevented the write
    WouldRewrite,
}

impl NormalizeOutcome {
    /// True when the file is, or would be, rewritten
    #[inline]
    pub const fn is_dirty(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Outcome for one path of a batch
#[derive(Debug)]
pub struct FileReport {
    /// The notebook path as given
    pub path: PathBuf,
    /// Outcome, or why this path failed
    pub result: Result<NormalizeOutcome>,
}

/// Per-path outcomes of [`normalize_files`], in input order
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One entry per input path
    pub files: Vec<FileReport>,
}

impl BatchReport {
    /// True when no path failed
    pub fn is_success(&self) -> bool {
        self.files.iter().all(|file| file.result.is_ok())
    }

    /// Paths that failed, with their errors
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &NotebookError)> {
        self.files
            .iter()
            .filter_map(|file| file.result.as_ref().err().map(|e| (file.path.as_path(), e)))
    }

    /// Number of paths with the given outcome
    pub fn count(&self, outcome: NormalizeOutcome) -> usize {
        self.files
            .iter()
            .filter(|file| matches!(file.result, Ok(o) if o == outcome))
            .count()
    }
}

/// Normalize a document in memory.
///
/// Returns the normalized document and whether anything changed:
/// 1. `metadata.kernelspec.display_name` is reset to the canonical name;
/// 2. `metadata.language_info.version` is removed;
/// 3. code cells lose their outputs and execution counter;
/// 4. every cell's metadata is reduced to the solution marker.
pub fn normalize_document(
    mut notebook: NotebookDocument,
    options: &NormalizeOptions,
) -> (NotebookDocument, bool) {
    let mut dirty = false;

    if let Some(metadata) = notebook.metadata.take() {
        let (metadata, renamed) = normalize_kernel_display_name(metadata, &options.display_name);
        let (metadata, dropped) = drop_language_version(metadata);
        notebook.metadata = Some(metadata);
        dirty |= renamed | dropped;
    }

    let mut cells = Vec::with_capacity(notebook.cells.len());
    for (index, cell) in std::mem::take(&mut notebook.cells).into_iter().enumerate() {
        let (cell, reset) = reset_execution_state(cell);
        let (cell, stripped) = normalize_cell_metadata(cell, &options.marker);
        if reset || stripped {
            log::trace!("cell {index}: execution reset {reset}, metadata stripped {stripped}");
        }
        dirty |= reset | stripped;
        cells.push(cell);
    }
    notebook.cells = cells;

    (notebook, dirty)
}

/// Normalize the notebook at `path` in place.
///
/// The file is rewritten, pretty-printed, only when normalization changed
/// it; otherwise it is not opened for writing at all.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is malformed, or cannot be
/// written back.
pub fn normalize_file(path: &Path, options: &NormalizeOptions) -> Result<NormalizeOutcome> {
    let notebook = parse_notebook(path)?;
    let (notebook, dirty) = normalize_document(notebook, options);

    if !dirty {
        log::debug!("{}: already normalized", path.display());
        return Ok(NormalizeOutcome::Unchanged);
    }
    if options.check_only {
        log::debug!("{}: needs normalizing", path.display());
        return Ok(NormalizeOutcome::WouldRewrite);
    }

    let bytes = notebook.to_pretty_json(options.indent)?;
    write_atomically(path, &bytes)?;
    log::info!("{}: normalized", path.display());
    Ok(NormalizeOutcome::Rewritten)
}

/// Normalize every path independently.
///
/// A failure on one path never stops the others. With `parallel`, paths are
/// spread over the rayon thread pool; the report keeps input order either way.
pub fn normalize_files(
    paths: &[PathBuf],
    options: &NormalizeOptions,
    parallel: bool,
) -> BatchReport {
    let process = |path: &PathBuf| FileReport {
        path: path.clone(),
        result: normalize_file(path, options),
    };

    let files = if parallel {
        paths.par_iter().map(process).collect()
    } else {
        paths.iter().map(process).collect()
    };
    BatchReport { files }
}
