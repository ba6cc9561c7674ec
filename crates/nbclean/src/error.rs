//! Error types for notebook sanitizing

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for notebook parsing, transformation and write-back
#[derive(Error, Debug)]
pub enum NotebookError {
    /// The notebook (or its destination) could not be read or written
    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The input is not valid JSON or lacks the required notebook fields
    #[error("Malformed notebook document{}: {reason}", display_path(path.as_deref()))]
    Malformed {
        /// Path of the document, when it came from a file
        path: Option<PathBuf>,
        /// What was wrong with it
        reason: String,
    },
}

/// Broad classification of a [`NotebookError`], used for per-path reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid JSON or missing required fields
    MalformedDocument,
    /// Read or write failure
    IoFailure,
}

impl std::fmt::Display for ErrorKind {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::MalformedDocument => "malformed document",
            Self::IoFailure => "I/O failure",
        };
        write!(f, "{s}")
    }
}

impl NotebookError {
    /// Build an I/O error for `path`
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Build a malformed-document error with no path attached yet
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: None,
            reason: reason.into(),
        }
    }

    /// Attach the document path to a malformed-document error
    #[must_use]
    pub fn at_path(self, at: &Path) -> Self {
        match self {
            Self::Malformed { path: None, reason } => Self::Malformed {
                path: Some(at.to_path_buf()),
                reason,
            },
            other => other,
        }
    }

    /// Classify the error as a parse or an I/O failure
    #[inline]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::IoFailure,
            Self::Malformed { .. } => ErrorKind::MalformedDocument,
        }
    }
}

impl From<serde_json::Error> for NotebookError {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed(format!("invalid JSON: {err}"))
    }
}

fn display_path(path: Option<&Path>) -> String {
    path.map(|p| format!(" {}", p.display())).unwrap_or_default()
}

/// Result type alias for notebook operations
pub type Result<T> = std::result::Result<T, NotebookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_message_includes_path() {
        let err = NotebookError::malformed("missing \"cells\"").at_path(Path::new("a.ipynb"));
        assert_eq!(
            err.to_string(),
            "Malformed notebook document a.ipynb: missing \"cells\""
        );
        assert_eq!(err.kind(), ErrorKind::MalformedDocument);
    }

    #[test]
    fn test_at_path_keeps_existing_path() {
        let err = NotebookError::Malformed {
            path: Some(PathBuf::from("first.ipynb")),
            reason: "bad".to_string(),
        }
        .at_path(Path::new("second.ipynb"));
        assert!(err.to_string().contains("first.ipynb"));
    }

    #[test]
    fn test_io_kind() {
        let err = NotebookError::io(
            "missing.ipynb",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert_eq!(err.kind(), ErrorKind::IoFailure);
        assert!(err.to_string().starts_with("I/O failure on missing.ipynb"));
    }

    #[test]
    fn test_json_error_is_malformed() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: NotebookError = json_err.into();
        assert_eq!(err.kind(), ErrorKind::MalformedDocument);
    }
}
