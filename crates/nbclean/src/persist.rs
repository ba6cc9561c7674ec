//! Whole-file writes that never leave a truncated target behind.

use crate::error::{NotebookError, Result};
use std::fs::{self, Permissions};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Write `bytes` to a temporary file next to `path`, then rename it over
/// `path`. On any failure the temporary file is removed and `path` is left
/// as it was. An existing target keeps its permissions; if it is a symlink,
/// the file it points to is replaced and the link is kept.
///
/// # Errors
///
/// Returns [`NotebookError::Io`] if the parent directory is missing or not
/// writable, or if the rename fails.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let resolved = fs::canonicalize(path).ok();
    let path = resolved.as_deref().unwrap_or(path);
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| NotebookError::io(dir, e))?;
    temp.write_all(bytes)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| NotebookError::io(temp.path(), e))?;
    if let Some(permissions) = target_permissions(path) {
        temp.as_file()
            .set_permissions(permissions)
            .map_err(|e| NotebookError::io(temp.path(), e))?;
    }
    temp.persist(path)
        .map_err(|e| NotebookError::io(path, e.error))?;
    Ok(())
}

/// Permissions for the renamed file: the target's own when it exists,
/// otherwise the usual `rw-r--r--` instead of the temp file's `rw-------`.
fn target_permissions(path: &Path) -> Option<Permissions> {
    if let Ok(meta) = fs::metadata(path) {
        return Some(meta.permissions());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Some(Permissions::from_mode(0o644))
    }
    #[cfg(not(unix))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.ipynb");

        write_atomically(&target, b"first").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"first");

        write_atomically(&target, b"second").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"second");

        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "temporary file should have been renamed");
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_permissions_are_kept() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("shared.ipynb");
        std::fs::write(&target, b"old").unwrap();
        std::fs::set_permissions(&target, Permissions::from_mode(0o664)).unwrap();

        write_atomically(&target, b"new").unwrap();
        let mode = std::fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o664);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_is_written_through() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("real.ipynb");
        let link = dir.path().join("link.ipynb");
        std::fs::write(&target, b"old").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        write_atomically(&link, b"new").unwrap();
        assert!(std::fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read(&target).unwrap(), b"new");
    }

    #[test]
    fn test_missing_directory_is_io_failure() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("missing").join("out.ipynb");
        let err = write_atomically(&target, b"{}").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::IoFailure);
        assert!(!target.exists());
    }
}
