//! Transformation rules over single cells and document metadata.
//!
//! Every rule takes its input by value and returns the rewritten value,
//! together with a `changed` flag for the rules the normalizer folds over.
//! A rule that does not apply to its input returns it untouched.

use crate::ipynb::{Cell, CellType, ExecutionCount, Source};
use serde_json::{Map, Value};

/// True iff `marker` is a key of the cell's metadata
#[inline]
pub fn is_solution_cell(cell: &Cell, marker: &str) -> bool {
    cell.metadata.contains_key(marker)
}

/// Empty the source of a solution cell; any other cell is returned as-is
pub fn strip_solution_content(mut cell: Cell, marker: &str) -> Cell {
    if is_solution_cell(&cell, marker) {
        cell.set_source(Source::empty());
    }
    cell
}

/// Drop every metadata key except `marker`
pub fn normalize_cell_metadata(mut cell: Cell, marker: &str) -> (Cell, bool) {
    let before = cell.metadata.len();
    cell.metadata.retain(|key, _| key == marker);
    let changed = cell.metadata.len() != before;
    (cell, changed)
}

/// Clear outputs and the execution counter of a code cell
///
/// Fields missing from the cell stay missing. Non-code cells are untouched.
pub fn reset_execution_state(mut cell: Cell) -> (Cell, bool) {
    if cell.cell_type != CellType::Code {
        return (cell, false);
    }

    let mut changed = false;
    if let Some(outputs) = cell.outputs.as_mut() {
        if !outputs.is_empty() {
            outputs.clear();
            changed = true;
        }
    }
    if cell.execution_count.is_set() {
        cell.execution_count = ExecutionCount::Never;
        changed = true;
    }
    (cell, changed)
}

/// Reset `kernelspec.display_name` to `canonical` when present and different
pub fn normalize_kernel_display_name(
    mut metadata: Map<String, Value>,
    canonical: &str,
) -> (Map<String, Value>, bool) {
    let display_name = metadata
        .get_mut("kernelspec")
        .and_then(Value::as_object_mut)
        .and_then(|kernelspec| kernelspec.get_mut("display_name"));

    let changed = match display_name {
        Some(name) if name.as_str() != Some(canonical) => {
            *name = Value::from(canonical);
            true
        }
        _ => false,
    };
    (metadata, changed)
}

/// Remove `language_info.version` when present
pub fn drop_language_version(mut metadata: Map<String, Value>) -> (Map<String, Value>, bool) {
    let changed = metadata
        .get_mut("language_info")
        .and_then(Value::as_object_mut)
        .is_some_and(|language_info| language_info.shift_remove("version").is_some());
    (metadata, changed)
}
