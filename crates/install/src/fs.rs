//! Filesystem primitives used by the install swap

use async_trait::async_trait;
use bridge_errors::{Error, InstallError};
use std::path::Path;
use tokio::fs;

/// Directory operations the install transaction relies on
///
/// Rename and copy are kept as separate tiers: a rename is effectively
/// atomic on one volume, a copy is not, and the caller rolls back
/// differently for each.
#[async_trait]
pub trait SlotFilesystem: Send + Sync {
    /// Rename `from` to `to` in a single step
    async fn rename(&self, from: &Path, to: &Path) -> Result<(), Error>;

    /// Recursively copy the contents of `from` into `to`, creating `to`
    async fn copy_tree(&self, from: &Path, to: &Path) -> Result<(), Error>;

    /// Remove a directory tree; a missing path is not an error
    async fn remove_tree(&self, path: &Path) -> Result<(), Error>;
}

/// [`SlotFilesystem`] backed by the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFilesystem;

#[async_trait]
impl SlotFilesystem for LocalFilesystem {
    async fn rename(&self, from: &Path, to: &Path) -> Result<(), Error> {
        fs::rename(from, to)
            .await
            .map_err(|e| fs_error("rename", from, &e))
    }

    async fn copy_tree(&self, from: &Path, to: &Path) -> Result<(), Error> {
        copy_directory_recursive(from, to).await
    }

    async fn remove_tree(&self, path: &Path) -> Result<(), Error> {
        match fs::remove_dir_all(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(fs_error("remove", path, &e)),
        }
    }
}

/// Recursive directory copy; symbolic links are recreated, not followed
///
/// # Errors
///
/// Returns an error if any entry cannot be read or written.
pub async fn copy_directory_recursive(source: &Path, dest: &Path) -> Result<(), Error> {
    fs::create_dir_all(dest)
        .await
        .map_err(|e| fs_error("create_dir", dest, &e))?;

    let mut entries = fs::read_dir(source)
        .await
        .map_err(|e| fs_error("read_dir", source, &e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| fs_error("read_dir", source, &e))?
    {
        let entry_path = entry.path();
        let dest_path = dest.join(entry.file_name());
        let kind = entry
            .file_type()
            .await
            .map_err(|e| fs_error("stat", &entry_path, &e))?;

        if kind.is_dir() {
            Box::pin(copy_directory_recursive(&entry_path, &dest_path)).await?;
        } else if kind.is_symlink() {
            copy_symlink(&entry_path, &dest_path).await?;
        } else {
            fs::copy(&entry_path, &dest_path)
                .await
                .map_err(|e| fs_error("copy", &dest_path, &e))?;
        }
    }

    Ok(())
}

#[cfg(unix)]
async fn copy_symlink(source: &Path, dest: &Path) -> Result<(), Error> {
    let target = fs::read_link(source)
        .await
        .map_err(|e| fs_error("read_link", source, &e))?;
    fs::symlink(&target, dest)
        .await
        .map_err(|e| fs_error("symlink", dest, &e))
}

#[cfg(not(unix))]
async fn copy_symlink(source: &Path, dest: &Path) -> Result<(), Error> {
    fs::copy(source, dest)
        .await
        .map(|_| ())
        .map_err(|e| fs_error("copy", dest, &e))
}

fn fs_error(operation: &str, path: &Path, err: &std::io::Error) -> Error {
    InstallError::FilesystemError {
        operation: operation.to_string(),
        path: path.display().to_string(),
        message: err.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn copies_nested_tree() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(src.join("a/b")).unwrap();
        std::fs::write(src.join("top.txt"), "1").unwrap();
        std::fs::write(src.join("a/b/deep.txt"), "2").unwrap();

        let dst = tmp.path().join("dst");
        LocalFilesystem.copy_tree(&src, &dst).await.unwrap();

        assert_eq!(std::fs::read_to_string(dst.join("top.txt")).unwrap(), "1");
        assert_eq!(std::fs::read_to_string(dst.join("a/b/deep.txt")).unwrap(), "2");
    }

    #[tokio::test]
    async fn removing_missing_tree_is_ok() {
        let tmp = tempdir().unwrap();
        LocalFilesystem
            .remove_tree(&tmp.path().join("absent"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rename_failure_reports_filesystem_error() {
        let tmp = tempdir().unwrap();
        let err = LocalFilesystem
            .rename(&tmp.path().join("absent"), &tmp.path().join("other"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Install(InstallError::FilesystemError { .. })
        ));
    }
}
