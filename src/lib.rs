//! # edgequake-pdfsplit
//!
//! Split a scanned multi-document PDF into single-page PDFs by document type,
//! using a cloud classifier, and file each page into a per-type folder.
//!
//! ## Why this crate?
//!
//! Intake scans often bundle several identity documents (a passport, a
//! driver's licence, …) into one PDF. A trained Azure AI Document
//! Intelligence classifier says which pages belong to which document type;
//! this crate turns that answer into one single-page PDF per claimed page,
//! names them deterministically and uploads each to the folder for its type.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      validate the path, check %PDF magic, read bytes
//!  ├─ 2. Classify   Azure Document Intelligence (submit + poll)
//!  ├─ 3. Partition  first claim wins, unrecognized types skipped (pure plan)
//!  ├─ 4. Extract    copy each claimed page into its own PDF via pdfium (spawn_blocking)
//!  ├─ 5. Name       {base}_{type}.pdf, {base}_{type}_2.pdf, …
//!  └─ 6. Upload     SharePoint via Microsoft Graph, or a local directory
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfsplit::{
//!     AzureClassifierConfig, AzureDocumentClassifier, LocalDirStorage, PdfiumExtractor,
//!     SplitConfig, SplitPipeline,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SplitConfig::builder().classifier_id("id-triage").build()?;
//!     let classifier = AzureDocumentClassifier::new(AzureClassifierConfig::new(
//!         "https://my-resource.cognitiveservices.azure.com/",
//!         std::env::var("AZURE_DI_KEY")?,
//!     ))?;
//!
//!     let pipeline = SplitPipeline::new(
//!         config,
//!         Arc::new(classifier),
//!         Arc::new(PdfiumExtractor::default()),
//!     )
//!     .with_storage(Arc::new(LocalDirStorage::new("out")));
//!
//!     let report = pipeline.run("scan.pdf").await?;
//!     for upload in &report.uploads {
//!         println!("{} → {}", upload.filename, upload.folder);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfsplit` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdfsplit = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod classifier;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod run;
pub mod storage;

#[cfg(test)]
mod http_stub;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use classifier::{AzureClassifierConfig, AzureDocumentClassifier, DocumentClassifier};
pub use config::{PageFailurePolicy, SplitConfig, SplitConfigBuilder};
pub use error::{PdfSplitError, SkipEvent, UploadFailure};
pub use model::{
    ClassificationDocument, ClassificationResult, PageReference, PartitionOutput, RunReport,
    RunStats, SplitArtifact, UploadRecord,
};
pub use pipeline::dispatch::{DispatchReport, UploadDispatcher};
pub use pipeline::extract::{PageExtractor, PdfiumExtractor, SourcePages};
pub use pipeline::naming::ArtifactNamer;
pub use pipeline::partition::{execute_plan, partition, plan_partition, PartitionPlan, PlanStep};
pub use progress::{NoopProgressCallback, ProgressCallback, SplitProgressCallback};
pub use run::SplitPipeline;
pub use storage::{GraphStorage, GraphStorageConfig, LocalDirStorage, RemoteStorage, StorageError};
