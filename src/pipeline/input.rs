//! Input resolution: validate a user-supplied path and read the source PDF.
//!
//! Both the classifier and the page extractor need the whole document in
//! memory, so the file is read once here. The PDF magic bytes (`%PDF`) are
//! checked first so callers get a meaningful error instead of a classifier
//! rejection or a pdfium parse failure.

use crate::error::PdfSplitError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A source PDF read into memory.
#[derive(Clone)]
pub struct SourcePdf {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for SourcePdf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourcePdf")
            .field("path", &self.path)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

/// Validate `path` (exists, readable, starts with `%PDF`) and read it.
pub async fn read_source(path: &Path) -> Result<SourcePdf, PdfSplitError> {
    resolve_local(path)?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| io_error(path, e))?;

    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(SourcePdf {
        path: path.to_path_buf(),
        bytes,
    })
}

/// Validate existence, read permission and PDF magic bytes.
pub fn resolve_local(path: &Path) -> Result<(), PdfSplitError> {
    if !path.exists() {
        return Err(PdfSplitError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut file = std::fs::File::open(path).map_err(|e| io_error(path, e))?;
    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) if &magic == b"%PDF" => Ok(()),
        Ok(()) => Err(PdfSplitError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        }),
        // Shorter than the magic itself
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(PdfSplitError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        }),
        Err(e) => Err(io_error(path, e)),
    }
}

fn io_error(path: &Path, e: std::io::Error) -> PdfSplitError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => PdfSplitError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => PdfSplitError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => PdfSplitError::Internal(format!("Failed to read {}: {}", path.display(), e)),
    }
}
