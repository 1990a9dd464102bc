//! Data types that flow through the pipeline.
//!
//! ```text
//! classifier ──▶ ClassificationResult ──▶ partition ──▶ SplitArtifact* ──▶ dispatch ──▶ UploadRecord*
//! ```
//!
//! Classification types are immutable once received. A [`SplitArtifact`] owns
//! its bytes; ownership moves into the upload dispatcher, which either stores
//! it or drops it.

use crate::error::{SkipEvent, UploadFailure};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A single page assertion within a [`ClassificationDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageReference {
    /// 1-based page number, as reported by the service.
    pub page_number: u32,
}

impl PageReference {
    pub fn new(page_number: u32) -> Self {
        Self { page_number }
    }

    /// Zero-based page index, or `None` when the reported number is below 1.
    pub fn page_index(&self) -> Option<usize> {
        (self.page_number as usize).checked_sub(1)
    }
}

/// One typed assertion from the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationDocument {
    /// Free-text label; compared case-insensitively.
    pub doc_type: String,
    /// 0.0–1.0. Carried for reporting; partitioning ignores it.
    pub confidence: f32,
    /// Pages this document covers, in service order.
    pub bounding_regions: Vec<PageReference>,
}

impl ClassificationDocument {
    pub fn new(doc_type: impl Into<String>, confidence: f32, pages: &[u32]) -> Self {
        Self {
            doc_type: doc_type.into(),
            confidence,
            bounding_regions: pages.iter().copied().map(PageReference::new).collect(),
        }
    }

    /// The reported 1-based page numbers, in order.
    pub fn page_numbers(&self) -> Vec<u32> {
        self.bounding_regions.iter().map(|r| r.page_number).collect()
    }
}

/// The normalized classifier response for one input document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub documents: Vec<ClassificationDocument>,
}

impl ClassificationResult {
    pub fn new(documents: Vec<ClassificationDocument>) -> Self {
        Self { documents }
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }
}

/// One single-page output document tagged with its detected type.
#[derive(Clone, PartialEq, Eq)]
pub struct SplitArtifact {
    /// Single-page PDF content.
    pub bytes: Vec<u8>,
    /// Lower-cased document type.
    pub doc_type: String,
    /// Zero-based index of the page in the source document.
    pub page_index: usize,
}

impl fmt::Debug for SplitArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitArtifact")
            .field("doc_type", &self.doc_type)
            .field("page_index", &self.page_index)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

/// Result of partitioning one document: artifacts in creation order plus
/// every recoverable event recorded along the way.
#[derive(Debug, Clone, Default)]
pub struct PartitionOutput {
    pub artifacts: Vec<SplitArtifact>,
    pub events: Vec<SkipEvent>,
}

/// One successfully stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub filename: String,
    pub folder: String,
    pub doc_type: String,
    /// 1-based source page number.
    pub page: usize,
    pub size_bytes: usize,
    /// Backend-specific location (URL or file path).
    pub location: String,
}

/// Timing for a complete run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub classify_duration_ms: u64,
    pub split_duration_ms: u64,
    pub upload_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a full classify → split → upload run produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub source: PathBuf,
    /// Base name used for artifact filenames.
    pub base_name: String,
    /// Documents reported by the classifier.
    pub classified_documents: usize,
    /// Artifacts produced by partitioning.
    pub artifacts: usize,
    pub events: Vec<SkipEvent>,
    pub uploads: Vec<UploadRecord>,
    pub failures: Vec<UploadFailure>,
    pub stats: RunStats,
}

impl RunReport {
    /// True when every produced artifact was stored.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
