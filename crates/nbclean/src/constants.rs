//! Fixed values shared by both sanitizers.

/// Metadata key flagging a cell as tutorial solution content.
///
/// Only the key's presence matters; its value is never read.
pub const SOLUTION_MARKER: &str = "is_khiops_tutorial_solution";

/// Kernel display name every committed notebook is reset to
pub const CANONICAL_DISPLAY_NAME: &str = "Python 3";

/// Spaces per nesting level when writing normalized notebooks
pub const PRETTY_INDENT: usize = 1;

/// Default coursework output directory, relative to the working directory
pub const COURSEWORK_DIR: &str = "coursework";

/// Default auxiliary data directory copied into the coursework
pub const DATA_DIR: &str = "data";

/// Notebook file extension, without the dot
pub const NOTEBOOK_EXTENSION: &str = "ipynb";
