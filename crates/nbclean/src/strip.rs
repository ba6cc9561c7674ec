//! Solution stripping for coursework copies.

use crate::constants::SOLUTION_MARKER;
use crate::error::Result;
use crate::ipynb::{parse_notebook, NotebookDocument};
use crate::persist::write_atomically;
use crate::rules::{is_solution_cell, strip_solution_content};
use std::path::Path;

/// Options for the solution stripper
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StripOptions {
    /// Metadata key that flags solution cells
    pub marker: String,
}

impl Default for StripOptions {
    fn default() -> Self {
        Self {
            marker: SOLUTION_MARKER.to_string(),
        }
    }
}

/// Summary of one stripped notebook
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StripReport {
    /// Number of cells in the notebook
    pub cells: usize,
    /// Number of solution cells whose source was cleared
    pub solutions: usize,
}

/// Return a copy of `notebook` with every solution cell's source emptied.
///
/// The input is left untouched; document metadata and all other cells are
/// copied verbatim.
#[must_use]
pub fn strip_solutions(notebook: &NotebookDocument, marker: &str) -> NotebookDocument {
    let mut stripped = notebook.clone();
    stripped.cells = std::mem::take(&mut stripped.cells)
        .into_iter()
        .map(|cell| strip_solution_content(cell, marker))
        .collect();
    stripped
}

/// Read the notebook at `input`, strip its solutions and write the result,
/// compact, to `output`.
///
/// `output` is only replaced once the whole document has been parsed and
/// serialized; `input` is never written.
///
/// # Errors
///
/// Returns an error if `input` cannot be read or is malformed, or if
/// `output` cannot be written.
pub fn create_notebook_without_solutions(
    input: &Path,
    output: &Path,
    options: &StripOptions,
) -> Result<StripReport> {
    let notebook = parse_notebook(input)?;
    let report = StripReport {
        cells: notebook.cells.len(),
        solutions: notebook
            .cells
            .iter()
            .filter(|cell| is_solution_cell(cell, &options.marker))
            .count(),
    };

    let stripped = strip_solutions(&notebook, &options.marker);
    let bytes = stripped.to_compact_json()?;
    write_atomically(output, &bytes)?;

    log::debug!(
        "{} -> {}: cleared {} of {} cells",
        input.display(),
        output.display(),
        report.solutions,
        report.cells
    );
    Ok(report)
}
