//! # nbclean
//!
//! Sanitizing of Jupyter notebooks (nbformat 4.x) for tutorial repositories.
//!
//! Two pipelines share one typed document model:
//! - **Solution stripping** writes a coursework copy of a notebook in which
//!   every cell flagged with the solution marker has an empty source.
//! - **Normalization** rewrites a notebook in place before it is committed:
//!   canonical kernel display name, no language version, no outputs or
//!   execution counters, and no cell metadata besides the solution marker.
//!   Clean notebooks are never rewritten.
//!
//! ## Example
//!
//! ```no_run
//! use nbclean::{normalize_file, NormalizeOptions, NormalizeOutcome};
//!
//! let outcome = normalize_file("tutorial.ipynb".as_ref(), &NormalizeOptions::default())?;
//! if outcome == NormalizeOutcome::Rewritten {
//!     println!("tutorial.ipynb normalized");
//! }
//! # Ok::<(), nbclean::NotebookError>(())
//! ```

/// Fixed marker, display name and layout values
pub mod constants;
/// Coursework directory builder
pub mod coursework;
/// Error types for notebook operations
pub mod error;
/// Jupyter notebook (ipynb) document model
pub mod ipynb;
/// In-place normalization
pub mod normalize;
/// Head-of-file preview
pub mod peek;
/// Atomic file writes
pub mod persist;
/// Cell and metadata transformation rules
pub mod rules;
/// Solution stripping
pub mod strip;

pub use coursework::{build_coursework, find_notebooks, CourseworkOptions, CourseworkReport};
pub use error::{ErrorKind, NotebookError, Result};
pub use ipynb::{
    parse_notebook, parse_notebook_from_str, Cell, CellType, ExecutionCount, NotebookDocument,
    Source,
};
pub use normalize::{
    normalize_document, normalize_file, normalize_files, BatchReport, NormalizeOptions,
    NormalizeOutcome,
};
pub use rules::{
    is_solution_cell, normalize_cell_metadata, reset_execution_state, strip_solution_content,
};
pub use strip::{create_notebook_without_solutions, strip_solutions, StripOptions, StripReport};
