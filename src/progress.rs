//! Progress-callback trait for pipeline events.
//!
//! Inject an [`Arc<dyn SplitProgressCallback>`] via
//! [`crate::config::SplitConfigBuilder::progress_callback`] to receive events
//! as the pipeline classifies, splits and uploads a document.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfsplit::{SplitConfig, SplitProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     uploaded: AtomicUsize,
//! }
//!
//! impl SplitProgressCallback for CountingCallback {
//!     fn on_upload_complete(&self, filename: &str, folder: &str) {
//!         self.uploaded.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{filename} → {folder}");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { uploaded: AtomicUsize::new(0) });
//!
//! let config = SplitConfig::builder()
//!     .classifier_id("id-triage")
//!     .progress_callback(counter as Arc<dyn SplitProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::SkipEvent;
use std::sync::Arc;

/// Called by the pipeline at each stage boundary and per uploaded artifact.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events arrive sequentially; the pipeline never
/// processes two artifacts at once.
pub trait SplitProgressCallback: Send + Sync {
    /// Called once the classifier has answered.
    ///
    /// # Arguments
    /// * `documents` — number of typed documents the classifier reported
    fn on_classified(&self, documents: usize) {
        let _ = documents;
    }

    /// Called once partitioning has finished.
    ///
    /// # Arguments
    /// * `artifacts` — single-page documents produced
    /// * `events`    — recoverable skips recorded while partitioning
    fn on_partitioned(&self, artifacts: usize, events: &[SkipEvent]) {
        let _ = (artifacts, events);
    }

    /// Called before an artifact is handed to storage.
    ///
    /// # Arguments
    /// * `index`    — 1-based position in the artifact sequence
    /// * `total`    — number of artifacts
    /// * `filename` — target filename
    fn on_upload_start(&self, index: usize, total: usize, filename: &str) {
        let _ = (index, total, filename);
    }

    /// Called when an artifact was stored.
    fn on_upload_complete(&self, filename: &str, folder: &str) {
        let _ = (filename, folder);
    }

    /// Called when an artifact could not be stored. The run continues.
    fn on_upload_error(&self, filename: &str, error: &str) {
        let _ = (filename, error);
    }

    /// Called once after every artifact has been attempted.
    fn on_run_complete(&self, uploaded: usize, failed: usize) {
        let _ = (uploaded, failed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SplitProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SplitConfig`].
pub type ProgressCallback = Arc<dyn SplitProgressCallback>;
