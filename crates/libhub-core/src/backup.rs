//! Snapshots of files and folders taken before a destructive command touches them.

use std::path::{Path, PathBuf};

use libhub_utils::fs::{copy_path, safe_remove};
use tempfile::TempDir;
use tracing::debug;

use crate::error::{ErrorContext, Result};

/// Undo log for one maintenance command.
///
/// Every path is copied with [`Backup::backup`] before it is modified. On failure the command
/// calls [`Backup::restore`] to put every path back, on success [`Backup::clean`] drops the
/// snapshots.
#[derive(Default)]
pub struct Backup {
    root: Option<TempDir>,
    entries: Vec<(PathBuf, PathBuf)>,
}

impl Backup {
    pub fn new() -> Self {
        Self::default()
    }

    fn root(&mut self) -> Result<&Path> {
        if self.root.is_none() {
            let dir = TempDir::with_prefix("libhub-backup-")
                .with_context(|| "creating backup folder".to_string())?;
            self.root = Some(dir);
        }
        Ok(self.root.as_ref().map(TempDir::path).unwrap_or(Path::new("")))
    }

    /// Copies `path`, a file or a folder, into a fresh snapshot slot.
    pub fn backup<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let original = path.as_ref().to_path_buf();
        let index = self.entries.len().to_string();
        let slot = self.root()?.join(index);
        let snapshot = match original.file_name() {
            Some(name) => slot.join(name),
            None => slot.join("snapshot"),
        };

        copy_path(&original, &snapshot)?;
        debug!(
            "backed up {} to {}",
            original.display(),
            snapshot.display()
        );
        self.entries.push((original, snapshot));
        Ok(())
    }

    /// Puts every backed up path back to its recorded state, in backup order.
    pub fn restore(&self) -> Result<()> {
        for (original, snapshot) in &self.entries {
            debug!("restoring {}", original.display());
            if snapshot.is_dir() {
                safe_remove(original)?;
            }
            copy_path(snapshot, original)?;
        }
        Ok(())
    }

    /// Discards all snapshots.
    pub fn clean(self) -> Result<()> {
        if let Some(root) = self.root {
            root.close()
                .with_context(|| "removing backup folder".to_string())?;
        }
        Ok(())
    }
}
