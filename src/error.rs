//! Error types for the edgequake-pdfsplit library.
//!
//! Three distinct types reflect three distinct failure modes:
//!
//! * [`PdfSplitError`] — **Fatal**: the run cannot proceed at all (missing
//!   input file, classifier unreachable, source PDF unreadable). Returned as
//!   `Err(PdfSplitError)` from the [`crate::run::SplitPipeline`] entry points.
//!
//! * [`SkipEvent`] — **Recoverable, per page**: a classifier assertion was
//!   ignored (unrecognized type, page already claimed, page could not be
//!   extracted). Recorded in [`crate::model::PartitionOutput::events`] and the
//!   partitioning continues.
//!
//! * [`UploadFailure`] — **Recoverable, per artifact**: one split document
//!   could not be stored. Recorded in [`crate::model::RunReport::failures`];
//!   the remaining artifacts are still uploaded and nothing is rolled back.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdfsplit library.
#[derive(Debug, Error)]
pub enum PdfSplitError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Classification errors ─────────────────────────────────────────────
    /// The classification service could not be reached or returned a
    /// response that could not be interpreted. Never retried.
    #[error("Classification with '{classifier_id}' failed: {reason}")]
    ClassificationFailed {
        classifier_id: String,
        reason: String,
    },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The source PDF could not be opened or parsed.
    #[error("Source PDF cannot be read: {detail}")]
    SourceDocumentUnreadable { detail: String },

    /// A classified page does not exist in the source document.
    ///
    /// Only returned under [`crate::config::PageFailurePolicy::Abort`].
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// Copying a single page into a new document failed.
    ///
    /// Only returned under [`crate::config::PageFailurePolicy::Abort`].
    #[error("Extracting page {page} failed: {detail}")]
    PageExtractionFailed { page: usize, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Splitting needs a pdfium shared library. You can:\n\
  • Place libpdfium next to the binary or in the working directory.\n\
  • Set PDFIUM_LIB_PATH=/path/to/dir/containing/libpdfium.\n\
  • Install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A recoverable event recorded while partitioning a document.
///
/// The run continues after each of these; they exist so callers can report
/// what was dropped and why.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipEvent {
    /// A classified document's type is not in the recognized set; all of its
    /// pages were ignored.
    #[error("Skipping unrecognized doc_type '{doc_type}' (pages {pages:?})")]
    UnrecognizedDocumentType { doc_type: String, pages: Vec<u32> },

    /// The page was already claimed by an earlier document; first claim wins.
    #[error("Page {page} already claimed as '{claimed_by}', dropping '{doc_type}' claim")]
    DuplicatePageClaim {
        page: usize,
        doc_type: String,
        claimed_by: String,
    },

    /// The service reported a page number below 1.
    #[error("Ignoring invalid page number {page_number} for '{doc_type}'")]
    InvalidPageNumber { page_number: u32, doc_type: String },

    /// The page was claimed but could not be extracted.
    ///
    /// Only recorded under [`crate::config::PageFailurePolicy::Skip`]; the page
    /// stays claimed so later claims on it are still dropped as duplicates.
    #[error("Page {page}: extraction as '{doc_type}' failed: {detail}")]
    ExtractionFailed {
        page: usize,
        doc_type: String,
        detail: String,
    },
}

/// A per-artifact failure recorded by the upload dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UploadFailure {
    /// No storage target is configured for the artifact's type.
    #[error("{filename}: no storage target configured for '{doc_type}'")]
    NoStorageTarget { filename: String, doc_type: String },

    /// The storage backend rejected the folder check or the upload.
    #[error("Failed to upload {filename} to '{folder}': {reason}")]
    UploadFailed {
        filename: String,
        folder: String,
        reason: String,
    },
}

impl UploadFailure {
    /// The target filename of the artifact that failed.
    pub fn filename(&self) -> &str {
        match self {
            UploadFailure::NoStorageTarget { filename, .. } => filename,
            UploadFailure::UploadFailed { filename, .. } => filename,
        }
    }
}
