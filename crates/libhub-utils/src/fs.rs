use std::{fs, path::Path};

use walkdir::WalkDir;

use crate::error::{FileSystemError, FileSystemResult};

/// Removes the specified file or directory safely.
///
/// If the path does not exist, this function returns `Ok(())` without error. Directories are
/// removed recursively, files and symlinks with [`std::fs::remove_file`].
///
/// # Errors
///
/// Returns a [`FileSystemError::File`] if the removal fails for any reason other than the path
/// not existing.
pub fn safe_remove<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();

    let Ok(metadata) = fs::symlink_metadata(path) else {
        return Ok(());
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    result.map_err(|err| {
        FileSystemError::File {
            path: path.to_path_buf(),
            action: "remove",
            source: err,
        }
    })
}

/// Creates a directory structure if it doesn't exist.
///
/// # Errors
///
/// * [`FileSystemError::Directory`] if the directory could not be created.
/// * [`FileSystemError::NotADirectory`] if the path exists but is not a directory.
pub fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();

    if path.exists() {
        if !path.is_dir() {
            return Err(FileSystemError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        return Ok(());
    }

    fs::create_dir_all(path).map_err(|err| {
        FileSystemError::Directory {
            path: path.to_path_buf(),
            action: "create",
            source: err,
        }
    })
}

/// Copies a file or a whole directory tree from `src` to `dst`.
///
/// Parent directories of `dst` are created as needed. Symlinks are recreated rather than
/// followed.
///
/// # Errors
///
/// * [`FileSystemError::NotFound`] if `src` does not exist.
/// * [`FileSystemError::Walk`] if the source tree cannot be traversed.
/// * [`FileSystemError::File`] or [`FileSystemError::Directory`] if a copy step fails.
pub fn copy_path<S: AsRef<Path>, D: AsRef<Path>>(src: S, dst: D) -> FileSystemResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    let metadata = fs::symlink_metadata(src).map_err(|_| {
        FileSystemError::NotFound {
            path: src.to_path_buf(),
        }
    })?;

    if let Some(parent) = dst.parent() {
        ensure_dir_exists(parent)?;
    }

    if !metadata.is_dir() {
        return copy_entry(src, dst, &metadata);
    }

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|err| {
            FileSystemError::Walk {
                path: src.to_path_buf(),
                source: err,
            }
        })?;
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(relative);

        let metadata = entry.path().symlink_metadata().map_err(|err| {
            FileSystemError::File {
                path: entry.path().to_path_buf(),
                action: "stat",
                source: err,
            }
        })?;

        if metadata.is_dir() {
            ensure_dir_exists(&target)?;
        } else {
            copy_entry(entry.path(), &target, &metadata)?;
        }
    }

    Ok(())
}

fn copy_entry(src: &Path, dst: &Path, metadata: &fs::Metadata) -> FileSystemResult<()> {
    if metadata.file_type().is_symlink() {
        let link = fs::read_link(src).map_err(|err| {
            FileSystemError::File {
                path: src.to_path_buf(),
                action: "read link",
                source: err,
            }
        })?;
        return create_symlink(&link, dst);
    }

    fs::copy(src, dst).map(|_| ()).map_err(|err| {
        FileSystemError::File {
            path: dst.to_path_buf(),
            action: "copy",
            source: err,
        }
    })
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> FileSystemResult<()> {
    std::os::unix::fs::symlink(target, link).map_err(|err| {
        FileSystemError::File {
            path: link.to_path_buf(),
            action: "symlink",
            source: err,
        }
    })
}

#[cfg(not(unix))]
fn create_symlink(target: &Path, link: &Path) -> FileSystemResult<()> {
    fs::copy(target, link).map(|_| ()).map_err(|err| {
        FileSystemError::File {
            path: link.to_path_buf(),
            action: "copy",
            source: err,
        }
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_safe_remove_file_and_dir() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("file.txt");
        fs::write(&file, "data").unwrap();
        safe_remove(&file).unwrap();
        assert!(!file.exists());

        let dir = tmp.path().join("nested/dir");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("inner"), "data").unwrap();
        safe_remove(tmp.path().join("nested")).unwrap();
        assert!(!tmp.path().join("nested").exists());
    }

    #[test]
    fn test_safe_remove_missing_is_ok() {
        let tmp = tempdir().unwrap();
        assert!(safe_remove(tmp.path().join("missing")).is_ok());
    }

    #[test]
    fn test_ensure_dir_exists() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("a/b/c");
        ensure_dir_exists(&dir).unwrap();
        assert!(dir.is_dir());
        ensure_dir_exists(&dir).unwrap();
    }

    #[test]
    fn test_ensure_dir_exists_rejects_file() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("file");
        fs::write(&file, "").unwrap();
        let err = ensure_dir_exists(&file).unwrap_err();
        assert!(matches!(err, FileSystemError::NotADirectory { .. }));
    }

    #[test]
    fn test_copy_path_tree() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("top.txt"), "top").unwrap();
        fs::write(src.join("sub/inner.txt"), "inner").unwrap();

        let dst = tmp.path().join("out/copy");
        copy_path(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("top.txt")).unwrap(), "top");
        assert_eq!(
            fs::read_to_string(dst.join("sub/inner.txt")).unwrap(),
            "inner"
        );
    }

    #[test]
    fn test_copy_path_single_file() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("file.zip");
        fs::write(&src, "zip").unwrap();
        let dst = tmp.path().join("backup/1/file.zip");
        copy_path(&src, &dst).unwrap();
        assert_eq!(fs::read_to_string(dst).unwrap(), "zip");
    }

    #[test]
    fn test_copy_path_missing_source() {
        let tmp = tempdir().unwrap();
        let err = copy_path(tmp.path().join("nope"), tmp.path().join("dst")).unwrap_err();
        assert!(matches!(err, FileSystemError::NotFound { .. }));
    }
}
