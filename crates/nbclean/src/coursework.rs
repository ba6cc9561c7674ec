//! Build the student distribution of a tutorial directory.
//!
//! The coursework directory is rebuilt from scratch on every run: the data
//! directory is copied verbatim and every notebook of the working directory
//! is copied with its solution cells emptied.

use crate::constants::{COURSEWORK_DIR, DATA_DIR, NOTEBOOK_EXTENSION, SOLUTION_MARKER};
use crate::error::{NotebookError, Result};
use crate::strip::{create_notebook_without_solutions, StripOptions, StripReport};
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Options for [`build_coursework`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CourseworkOptions {
    /// Directory holding the tutorial notebooks
    pub root: PathBuf,
    /// Output directory, deleted and recreated
    pub output_dir: PathBuf,
    /// Auxiliary data directory copied to `<output_dir>/data`
    pub data_dir: PathBuf,
    /// Metadata key that flags solution cells
    pub marker: String,
    /// Strip notebooks on the rayon thread pool
    pub parallel: bool,
}

impl CourseworkOptions {
    /// Default layout under `root`: `root/coursework` and `root/data`
    pub fn in_dir(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            output_dir: root.join(COURSEWORK_DIR),
            data_dir: root.join(DATA_DIR),
            root,
            marker: SOLUTION_MARKER.to_string(),
            parallel: false,
        }
    }
}

impl Default for CourseworkOptions {
    fn default() -> Self {
        Self::in_dir(".")
    }
}

/// One notebook of the coursework
#[derive(Debug)]
pub struct CourseworkEntry {
    /// Source notebook
    pub input: PathBuf,
    /// Stripped copy
    pub output: PathBuf,
    /// What was stripped, or why this notebook failed
    pub result: Result<StripReport>,
}

/// Summary of a coursework build
#[derive(Debug, Default)]
pub struct CourseworkReport {
    /// Files copied from the data directory
    pub data_files: usize,
    /// Notebooks, sorted by path
    pub notebooks: Vec<CourseworkEntry>,
}

impl CourseworkReport {
    /// True when every notebook was stripped
    pub fn is_success(&self) -> bool {
        self.notebooks.iter().all(|entry| entry.result.is_ok())
    }
}

/// Rebuild the coursework directory.
///
/// Notebook failures are recorded in the report and do not stop the build.
///
/// # Errors
///
/// Returns an error if the output directory overlaps the notebook root or
/// the data directory, cannot be recreated, the data directory cannot be
/// copied, or the notebooks cannot be listed. Nothing is deleted when the
/// directories overlap.
pub fn build_coursework(options: &CourseworkOptions) -> Result<CourseworkReport> {
    check_layout(options)?;

    log::info!("Creating coursework dir {}", options.output_dir.display());
    if options.output_dir.exists() {
        fs::remove_dir_all(&options.output_dir)
            .map_err(|e| NotebookError::io(&options.output_dir, e))?;
    }
    fs::create_dir_all(&options.output_dir)
        .map_err(|e| NotebookError::io(&options.output_dir, e))?;

    let data_files = if options.data_dir.is_dir() {
        log::info!("Copying resources from {}", options.data_dir.display());
        copy_tree(&options.data_dir, &options.output_dir.join(DATA_DIR))?
    } else {
        log::warn!(
            "Data directory {} not found, skipping resources",
            options.data_dir.display()
        );
        0
    };

    let strip_options = StripOptions {
        marker: options.marker.clone(),
    };
    let strip_one = |input: PathBuf| {
        let output = options
            .output_dir
            .join(input.file_name().unwrap_or_default());
        let result = create_notebook_without_solutions(&input, &output, &strip_options);
        CourseworkEntry {
            input,
            output,
            result,
        }
    };

    let inputs = find_notebooks(&options.root)?;
    let notebooks = if options.parallel {
        inputs.into_par_iter().map(strip_one).collect()
    } else {
        inputs.into_iter().map(strip_one).collect()
    };

    Ok(CourseworkReport {
        data_files,
        notebooks,
    })
}

/// List `*.ipynb` files directly inside `dir`, sorted, hidden files excluded
///
/// # Errors
///
/// Returns an error if `dir` cannot be read.
pub fn find_notebooks(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = Path::new(&glob::Pattern::escape(&dir.to_string_lossy()))
        .join(format!("*.{NOTEBOOK_EXTENSION}"));
    let match_options = glob::MatchOptions {
        require_literal_leading_dot: true,
        ..glob::MatchOptions::new()
    };
    let paths = glob::glob_with(&pattern.to_string_lossy(), match_options).map_err(|e| {
        NotebookError::io(dir, io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))
    })?;

    let mut notebooks = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            NotebookError::io(path, e.into())
        })?;
        if path.is_file() {
            notebooks.push(path);
        }
    }
    notebooks.sort();
    Ok(notebooks)
}

/// Refuse an output directory that is, or contains, the notebook root or
/// the data directory, or that lies inside the data directory.
fn check_layout(options: &CourseworkOptions) -> Result<()> {
    let output = resolve(&options.output_dir)?;
    let root = fs::canonicalize(&options.root).map_err(|e| NotebookError::io(&options.root, e))?;

    let overlap = if root.starts_with(&output) {
        Some("contains the notebook directory")
    } else if options.data_dir.is_dir() {
        let data = fs::canonicalize(&options.data_dir)
            .map_err(|e| NotebookError::io(&options.data_dir, e))?;
        if data.starts_with(&output) {
            Some("contains the data directory")
        } else if output.starts_with(&data) {
            Some("is inside the data directory")
        } else {
            None
        }
    } else {
        None
    };

    match overlap {
        Some(reason) => Err(NotebookError::io(
            &options.output_dir,
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("output directory {reason}"),
            ),
        )),
        None => Ok(()),
    }
}

/// Absolute form of `path`: its deepest existing ancestor canonicalized,
/// with the missing components appended
fn resolve(path: &Path) -> Result<PathBuf> {
    let mut existing = path;
    let mut missing = Vec::new();
    loop {
        match fs::canonicalize(existing) {
            Ok(base) => {
                return Ok(missing
                    .iter()
                    .rev()
                    .fold(base, |resolved: PathBuf, name| resolved.join(name)));
            }
            Err(e) => match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    missing.push(name.to_os_string());
                    existing = if parent.as_os_str().is_empty() {
                        Path::new(".")
                    } else {
                        parent
                    };
                }
                _ => return Err(NotebookError::io(path, e)),
            },
        }
    }
}

/// Copy the directory tree `from` to `to`, following symlinks. Returns the
/// number of files copied.
fn copy_tree(from: &Path, to: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(from).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            NotebookError::io(path, e.into())
        })?;
        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| NotebookError::io(&target, e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| NotebookError::io(entry.path(), e))?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_notebooks_sorted_and_flat() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.ipynb"), "{}").unwrap();
        fs::write(dir.path().join("a.ipynb"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join(".draft.ipynb"), "{}").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.ipynb"), "{}").unwrap();

        let found = find_notebooks(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.ipynb", "b.ipynb"]);
    }

    #[test]
    fn test_copy_tree_nested() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("data");
        fs::create_dir_all(from.join("sub")).unwrap();
        fs::write(from.join("Iris.txt"), "sepal\tpetal\n").unwrap();
        fs::write(from.join("sub").join("Adult.txt"), "age\n").unwrap();

        let to = dir.path().join("copy");
        assert_eq!(copy_tree(&from, &to).unwrap(), 2);
        assert_eq!(
            fs::read_to_string(to.join("sub").join("Adult.txt")).unwrap(),
            "age\n"
        );
    }

    #[test]
    fn test_overlapping_output_is_refused() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("tutorials");
        fs::create_dir_all(root.join("data")).unwrap();
        fs::write(root.join("T.ipynb"), r#"{"cells": []}"#).unwrap();
        fs::write(root.join("data").join("Iris.txt"), "Class\n").unwrap();

        for output in [
            root.join("."),
            root.clone(),
            dir.path().to_path_buf(),
            root.join("data"),
            root.join("data").join("coursework"),
        ] {
            let options = CourseworkOptions {
                output_dir: output.clone(),
                ..CourseworkOptions::in_dir(&root)
            };
            let err = build_coursework(&options).unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::IoFailure, "{output:?}");
            assert!(root.join("T.ipynb").is_file(), "{output:?}");
            assert!(root.join("data").join("Iris.txt").is_file(), "{output:?}");
        }
    }

    #[test]
    fn test_resolve_missing_components() {
        let dir = TempDir::new().unwrap();
        let base = fs::canonicalize(dir.path()).unwrap();
        assert_eq!(
            resolve(&dir.path().join("a").join("b")).unwrap(),
            base.join("a").join("b")
        );
        assert_eq!(resolve(dir.path()).unwrap(), base);
    }

    #[test]
    fn test_options_layout() {
        let options = CourseworkOptions::in_dir("/tutorials");
        assert_eq!(options.output_dir, Path::new("/tutorials/coursework"));
        assert_eq!(options.data_dir, Path::new("/tutorials/data"));
        assert_eq!(options.marker, SOLUTION_MARKER);
    }
}
