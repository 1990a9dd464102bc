//! Pipeline entry points.
//!
//! [`SplitPipeline::classify_file`] reads a PDF and reports what the
//! classifier found. [`SplitPipeline::run`] does the whole job: classify,
//! partition into single-page artifacts, name them and upload each to the
//! folder configured for its type.
//!
//! The pipeline holds its collaborators behind traits so any of them can be
//! replaced (fake classifier, local-directory storage, …) without touching
//! the orchestration.

use crate::classifier::DocumentClassifier;
use crate::config::SplitConfig;
use crate::error::PdfSplitError;
use crate::model::{ClassificationResult, PartitionOutput, RunReport, RunStats};
use crate::pipeline::dispatch::UploadDispatcher;
use crate::pipeline::extract::PageExtractor;
use crate::pipeline::naming::ArtifactNamer;
use crate::pipeline::{input, partition};
use crate::storage::RemoteStorage;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Classify → split → upload, for one document at a time.
pub struct SplitPipeline {
    config: SplitConfig,
    classifier: Arc<dyn DocumentClassifier>,
    extractor: Arc<dyn PageExtractor>,
    storage: Option<Arc<dyn RemoteStorage>>,
}

impl SplitPipeline {
    /// A pipeline without storage can classify and split but not [`run`](Self::run).
    pub fn new(
        config: SplitConfig,
        classifier: Arc<dyn DocumentClassifier>,
        extractor: Arc<dyn PageExtractor>,
    ) -> Self {
        Self {
            config,
            classifier,
            extractor,
            storage: None,
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn RemoteStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// Read `path` and classify it.
    ///
    /// # Errors
    /// - [`PdfSplitError::FileNotFound`] / [`PdfSplitError::PermissionDenied`] /
    ///   [`PdfSplitError::NotAPdf`] for a bad input path
    /// - [`PdfSplitError::ClassificationFailed`] if the service call fails
    pub async fn classify_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<ClassificationResult, PdfSplitError> {
        let source = input::read_source(path.as_ref()).await?;
        self.classify(&source.bytes).await
    }

    async fn classify(&self, bytes: &[u8]) -> Result<ClassificationResult, PdfSplitError> {
        let result = self
            .classifier
            .classify(bytes, &self.config.classifier_id)
            .await?;
        if let Some(cb) = &self.config.progress_callback {
            cb.on_classified(result.len());
        }
        Ok(result)
    }

    /// Partition `source` according to `result`.
    ///
    /// pdfium work runs on the blocking thread pool; the source bytes move
    /// there and are dropped with the open document.
    pub async fn split(
        &self,
        source: Vec<u8>,
        result: &ClassificationResult,
    ) -> Result<PartitionOutput, PdfSplitError> {
        let extractor = Arc::clone(&self.extractor);
        let result = result.clone();
        let recognized = self.config.recognized_types.clone();
        let password = self.config.password.clone();
        let policy = self.config.page_failure_policy;

        let output = tokio::task::spawn_blocking(move || {
            partition::partition(
                &*extractor,
                &source,
                password.as_deref(),
                &result,
                &recognized,
                policy,
            )
        })
        .await
        .map_err(|e| PdfSplitError::Internal(format!("Split task panicked: {}", e)))??;

        if let Some(cb) = &self.config.progress_callback {
            cb.on_partitioned(output.artifacts.len(), &output.events);
        }
        Ok(output)
    }

    /// Classify, split and upload the PDF at `path`.
    ///
    /// Returns `Ok` even when some artifacts failed to upload; check
    /// [`RunReport::failures`]. A run that produces no artifacts uploads
    /// nothing and still succeeds.
    ///
    /// # Errors
    /// Fatal errors only: bad input path, classification failure, an
    /// unreadable source document, an extraction failure under
    /// [`crate::config::PageFailurePolicy::Abort`], or no storage configured.
    pub async fn run(&self, path: impl AsRef<Path>) -> Result<RunReport, PdfSplitError> {
        let total_start = Instant::now();
        let path = path.as_ref();
        let storage = self.storage.as_ref().ok_or_else(|| {
            PdfSplitError::InvalidConfig("no storage backend configured".into())
        })?;
        info!("Starting PDF processing: {}", path.display());

        // ── Step 1: Read input ───────────────────────────────────────────────
        let source = input::read_source(path).await?;
        let mut namer = ArtifactNamer::for_source(path);

        // ── Step 2: Classify ─────────────────────────────────────────────────
        let classify_start = Instant::now();
        let result = self.classify(&source.bytes).await?;
        let classify_duration_ms = classify_start.elapsed().as_millis() as u64;
        info!(
            "Classification complete. Found {} documents in {}ms",
            result.len(),
            classify_duration_ms
        );

        // ── Step 3: Split ────────────────────────────────────────────────────
        let split_start = Instant::now();
        let output = self.split(source.bytes, &result).await?;
        let split_duration_ms = split_start.elapsed().as_millis() as u64;
        let artifact_count = output.artifacts.len();

        // ── Step 4: Upload ───────────────────────────────────────────────────
        let upload_start = Instant::now();
        let dispatch = if output.artifacts.is_empty() {
            info!("No valid documents to upload after splitting.");
            Default::default()
        } else {
            debug!(
                "Uploading {} artifacts to {}",
                artifact_count,
                storage.describe()
            );
            UploadDispatcher::new(&**storage, &self.config.storage_targets)
                .with_progress(self.config.progress_callback.clone())
                .dispatch(&mut namer, output.artifacts)
                .await
        };
        let upload_duration_ms = upload_start.elapsed().as_millis() as u64;

        if let Some(cb) = &self.config.progress_callback {
            cb.on_run_complete(dispatch.uploads.len(), dispatch.failures.len());
        }
        info!(
            "Processing complete: {} uploaded, {} failed",
            dispatch.uploads.len(),
            dispatch.failures.len()
        );

        Ok(RunReport {
            source: path.to_path_buf(),
            base_name: namer.base().to_string(),
            classified_documents: result.len(),
            artifacts: artifact_count,
            events: output.events,
            uploads: dispatch.uploads,
            failures: dispatch.failures,
            stats: RunStats {
                classify_duration_ms,
                split_duration_ms,
                upload_duration_ms,
                total_duration_ms: total_start.elapsed().as_millis() as u64,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClassificationDocument;
    use crate::pipeline::extract::testing::FakeExtractor;
    use crate::storage::LocalDirStorage;
    use async_trait::async_trait;
    use std::io::Write;

    struct FixedClassifier(ClassificationResult);

    #[async_trait]
    impl DocumentClassifier for FixedClassifier {
        async fn classify(
            &self,
            _document: &[u8],
            _classifier_id: &str,
        ) -> Result<ClassificationResult, PdfSplitError> {
            Ok(self.0.clone())
        }
    }

    struct FailingClassifier;

    #[async_trait]
    impl DocumentClassifier for FailingClassifier {
        async fn classify(
            &self,
            _document: &[u8],
            classifier_id: &str,
        ) -> Result<ClassificationResult, PdfSplitError> {
            Err(PdfSplitError::ClassificationFailed {
                classifier_id: classifier_id.to_string(),
                reason: "HTTP 401".into(),
            })
        }
    }

    fn config() -> SplitConfig {
        SplitConfig::builder().classifier_id("id-triage").build().unwrap()
    }

    fn pdf_file(dir: &Path, name: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"%PDF-1.7\n%%EOF\n").unwrap();
        path
    }

    #[tokio::test]
    async fn run_uploads_named_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let pdf = pdf_file(dir.path(), "doc.pdf");

        let classifier = FixedClassifier(ClassificationResult::new(vec![
            ClassificationDocument::new("passport", 0.9, &[1, 2]),
            ClassificationDocument::new("license", 0.8, &[2, 3]),
        ]));
        let pipeline = SplitPipeline::new(
            config(),
            Arc::new(classifier),
            Arc::new(FakeExtractor::with_pages(3)),
        )
        .with_storage(Arc::new(LocalDirStorage::new(&out)));

        let report = pipeline.run(&pdf).await.unwrap();

        assert!(report.is_complete());
        assert_eq!(report.base_name, "doc");
        assert_eq!(report.classified_documents, 2);
        assert_eq!(report.artifacts, 3);
        let names: Vec<_> = report.uploads.iter().map(|u| u.filename.as_str()).collect();
        assert_eq!(
            names,
            vec!["doc_passport.pdf", "doc_passport_2.pdf", "doc_license.pdf"]
        );
        assert_eq!(
            std::fs::read(out.join("License").join("doc_license.pdf")).unwrap(),
            b"page-2"
        );
        assert_eq!(report.events.len(), 1);
    }

    #[tokio::test]
    async fn run_without_artifacts_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = pdf_file(dir.path(), "doc.pdf");
        let extractor = Arc::new(FakeExtractor::with_pages(2));

        let classifier = FixedClassifier(ClassificationResult::new(vec![
            ClassificationDocument::new("invoice", 0.9, &[1, 2]),
        ]));
        let pipeline = SplitPipeline::new(config(), Arc::new(classifier), extractor.clone())
            .with_storage(Arc::new(LocalDirStorage::new(dir.path().join("out"))));

        let report = pipeline.run(&pdf).await.unwrap();
        assert_eq!(report.artifacts, 0);
        assert!(report.uploads.is_empty());
        assert_eq!(extractor.opens(), 0);
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn classification_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = pdf_file(dir.path(), "doc.pdf");
        let pipeline = SplitPipeline::new(
            config(),
            Arc::new(FailingClassifier),
            Arc::new(FakeExtractor::with_pages(1)),
        )
        .with_storage(Arc::new(LocalDirStorage::new(dir.path())));

        let err = pipeline.run(&pdf).await.unwrap_err();
        assert!(matches!(err, PdfSplitError::ClassificationFailed { .. }));
    }

    #[tokio::test]
    async fn missing_file_is_fatal_before_classification() {
        let pipeline = SplitPipeline::new(
            config(),
            Arc::new(FailingClassifier),
            Arc::new(FakeExtractor::with_pages(1)),
        )
        .with_storage(Arc::new(LocalDirStorage::new("/tmp")));

        let err = pipeline.run("/no/such/file.pdf").await.unwrap_err();
        assert!(matches!(err, PdfSplitError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn run_requires_storage() {
        let pipeline = SplitPipeline::new(
            config(),
            Arc::new(FailingClassifier),
            Arc::new(FakeExtractor::with_pages(1)),
        );
        assert!(matches!(
            pipeline.run("doc.pdf").await,
            Err(PdfSplitError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn classify_file_returns_result() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = pdf_file(dir.path(), "doc.pdf");
        let expected =
            ClassificationResult::new(vec![ClassificationDocument::new("passport", 0.9, &[1])]);
        let pipeline = SplitPipeline::new(
            config(),
            Arc::new(FixedClassifier(expected.clone())),
            Arc::new(FakeExtractor::with_pages(1)),
        );
        assert_eq!(pipeline.classify_file(&pdf).await.unwrap(), expected);
    }
}
