//! Local-directory storage: folders are sub-directories of a root.
//!
//! Useful for dry runs and for sites without SharePoint. Writes are atomic
//! (temp file + persist) so a crash never leaves a half-written PDF behind
//! under its final name.

use super::{check_filename, path_segments, RemoteStorage, StorageError};
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes artifacts below a local root directory.
#[derive(Debug, Clone)]
pub struct LocalDirStorage {
    root: PathBuf,
}

impl LocalDirStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn folder_path(&self, folder: &str) -> Result<PathBuf, StorageError> {
        let mut path = self.root.clone();
        for segment in path_segments(folder)? {
            path.push(segment);
        }
        Ok(path)
    }
}

#[async_trait]
impl RemoteStorage for LocalDirStorage {
    fn describe(&self) -> String {
        format!("local directory {}", self.root.display())
    }

    async fn ensure_folder(&self, folder: &str) -> Result<(), StorageError> {
        let dir = self.folder_path(folder)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::Io {
                path: dir.clone(),
                source: e,
            })?;
        debug!("Ensured local folder {}", dir.display());
        Ok(())
    }

    async fn upload(
        &self,
        folder: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        let size = bytes.len();
        check_filename(filename)?;
        let dir = self.folder_path(folder)?;
        let path = dir.join(filename);

        // Atomic write: temp file in the target directory, then persist
        let target = path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            let io_err = |path: &Path, source: std::io::Error| StorageError::Io {
                path: path.to_path_buf(),
                source,
            };
            let mut tmp = tempfile::Builder::new()
                .suffix(".pdf.tmp")
                .tempfile_in(&dir)
                .map_err(|e| io_err(&dir, e))?;
            tmp.write_all(&bytes).map_err(|e| io_err(tmp.path(), e))?;
            tmp.persist(&target).map_err(|e| io_err(&target, e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| StorageError::Io {
            path: path.clone(),
            source: std::io::Error::other(e),
        })??;

        debug!("Wrote {} ({} bytes)", path.display(), size);
        Ok(path.display().to_string())
    }
}
