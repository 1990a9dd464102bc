//! Document classification.
//!
//! A classifier takes the raw bytes of a multi-page PDF and returns the typed
//! documents it found, each with the pages it covers. The pipeline consumes
//! only the normalized [`ClassificationResult`]; wire formats stay inside the
//! implementation.

pub mod azure;

pub use azure::{AzureClassifierConfig, AzureDocumentClassifier};

use crate::error::PdfSplitError;
use crate::model::ClassificationResult;
use async_trait::async_trait;

/// A remote (or fake) document classification service.
#[async_trait]
pub trait DocumentClassifier: Send + Sync {
    /// Classify `document` with the model identified by `classifier_id`.
    ///
    /// Any failure (transport, authentication, a failed analysis, or a
    /// response that cannot be interpreted) is reported as
    /// [`PdfSplitError::ClassificationFailed`]. Absent document or region
    /// lists come back as empty sequences, never as errors.
    async fn classify(
        &self,
        document: &[u8],
        classifier_id: &str,
    ) -> Result<ClassificationResult, PdfSplitError>;
}
