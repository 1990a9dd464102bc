//! Destinations for split artifacts.
//!
//! The dispatcher only needs two operations from a backend: make sure a
//! named folder exists, and write named bytes into it. Everything else
//! (authentication, site discovery, HTTP details) stays inside the backend.
//!
//! | Backend | Folder | Upload |
//! |---------|--------|--------|
//! | [`GraphStorage`] | SharePoint folder under the document library, created on 404 | `PUT …:/content` via Microsoft Graph |
//! | [`LocalDirStorage`] | sub-directory of a local root | atomic temp-file + rename |

pub mod graph;
pub mod local;

pub use graph::{GraphStorage, GraphStorageConfig};
pub use local::LocalDirStorage;

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by storage backends.
///
/// The dispatcher turns every one of these into a per-artifact
/// [`crate::error::UploadFailure`]; none of them abort a run.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Token acquisition failed.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// The destination folder does not exist and could not be created.
    #[error("Folder '{folder}' unavailable: {reason}")]
    FolderUnavailable { folder: String, reason: String },

    /// The backend refused the upload.
    #[error("Upload rejected with HTTP {status}: {body}")]
    UploadRejected { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Folder or filename that would escape the storage root.
    #[error("Invalid storage path '{0}'")]
    InvalidPath(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A response could not be interpreted.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// A place split artifacts are written to.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// Human-readable description for logs.
    fn describe(&self) -> String;

    /// Make sure `folder` (slash-separated, relative to the storage root)
    /// exists, creating it if needed.
    async fn ensure_folder(&self, folder: &str) -> Result<(), StorageError>;

    /// Write `bytes` as `folder/filename`. Returns a backend-specific location
    /// (web URL or file path).
    async fn upload(
        &self,
        folder: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError>;
}

/// Split a slash-separated path into non-empty segments, rejecting `.` / `..`.
pub(crate) fn path_segments(path: &str) -> Result<Vec<&str>, StorageError> {
    let segments: Vec<&str> = path
        .split(['/', '\\'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if segments.iter().any(|s| *s == "." || *s == "..") {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

/// Reject filenames containing separators or traversal components.
pub(crate) fn check_filename(filename: &str) -> Result<(), StorageError> {
    if filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\'])
    {
        return Err(StorageError::InvalidPath(filename.to_string()));
    }
    Ok(())
}
