//! Pipeline integration tests over in-memory fakes.
//!
//! No network and no pdfium: the classifier returns a canned result, the
//! extractor serves synthetic pages, and storage records what it was given.

use async_trait::async_trait;
use edgequake_pdfsplit::{
    ClassificationDocument, ClassificationResult, DocumentClassifier, PageExtractor,
    PageFailurePolicy, PdfSplitError, RemoteStorage, SkipEvent, SourcePages, SplitConfig,
    SplitPipeline, SplitProgressCallback, StorageError, UploadFailure,
};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Fakes ────────────────────────────────────────────────────────────────────

struct CannedClassifier {
    result: ClassificationResult,
    calls: AtomicUsize,
}

impl CannedClassifier {
    fn new(documents: Vec<ClassificationDocument>) -> Arc<Self> {
        Arc::new(Self {
            result: ClassificationResult::new(documents),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl DocumentClassifier for CannedClassifier {
    async fn classify(
        &self,
        document: &[u8],
        _classifier_id: &str,
    ) -> Result<ClassificationResult, PdfSplitError> {
        assert!(document.starts_with(b"%PDF"));
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.result.clone())
    }
}

/// Serves `pages` synthetic pages; pages listed in `broken` fail to extract.
struct SyntheticExtractor {
    pages: usize,
    broken: HashSet<usize>,
    opened: AtomicUsize,
    live: Arc<AtomicUsize>,
}

impl SyntheticExtractor {
    fn new(pages: usize) -> Arc<Self> {
        Self::with_broken(pages, &[])
    }

    fn with_broken(pages: usize, broken: &[usize]) -> Arc<Self> {
        Arc::new(Self {
            pages,
            broken: broken.iter().copied().collect(),
            opened: AtomicUsize::new(0),
            live: Arc::new(AtomicUsize::new(0)),
        })
    }
}

struct SyntheticSource<'a> {
    owner: &'a SyntheticExtractor,
}

impl Drop for SyntheticSource<'_> {
    fn drop(&mut self) {
        self.owner.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SourcePages for SyntheticSource<'_> {
    fn page_count(&self) -> usize {
        self.owner.pages
    }

    fn extract_page(&mut self, index: usize) -> Result<Vec<u8>, PdfSplitError> {
        if self.owner.broken.contains(&index) {
            return Err(PdfSplitError::PageExtractionFailed {
                page: index + 1,
                detail: "corrupt content stream".into(),
            });
        }
        Ok(format!("%PDF-single page {}", index + 1).into_bytes())
    }
}

impl PageExtractor for SyntheticExtractor {
    fn with_source(
        &self,
        _source: &[u8],
        _password: Option<&str>,
        visit: &mut dyn FnMut(&mut dyn SourcePages) -> Result<(), PdfSplitError>,
    ) -> Result<(), PdfSplitError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        let mut source = SyntheticSource { owner: self };
        visit(&mut source)
    }
}

#[derive(Default)]
struct RecordingStorage {
    folders: Mutex<Vec<String>>,
    files: Mutex<Vec<(String, String, Vec<u8>)>>,
    reject: Mutex<HashSet<String>>,
}

#[async_trait]
impl RemoteStorage for RecordingStorage {
    fn describe(&self) -> String {
        "recording".into()
    }

    async fn ensure_folder(&self, folder: &str) -> Result<(), StorageError> {
        self.folders.lock().unwrap().push(folder.to_string());
        Ok(())
    }

    async fn upload(
        &self,
        folder: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        if self.reject.lock().unwrap().contains(filename) {
            return Err(StorageError::UploadRejected {
                status: 423,
                body: "locked".into(),
            });
        }
        self.files
            .lock()
            .unwrap()
            .push((folder.to_string(), filename.to_string(), bytes));
        Ok(format!("https://example.sharepoint.com/{folder}/{filename}"))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn write_pdf(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\n%%EOF\n").unwrap();
    path
}

fn config() -> SplitConfig {
    SplitConfig::builder()
        .classifier_id("id-triage")
        .build()
        .unwrap()
}

fn pipeline(
    config: SplitConfig,
    classifier: Arc<CannedClassifier>,
    extractor: Arc<SyntheticExtractor>,
    storage: Arc<RecordingStorage>,
) -> SplitPipeline {
    SplitPipeline::new(config, classifier, extractor).with_storage(storage)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn passport_and_license_share_a_page() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "doc.pdf");
    let storage = Arc::new(RecordingStorage::default());
    let extractor = SyntheticExtractor::new(3);

    let report = pipeline(
        config(),
        CannedClassifier::new(vec![
            ClassificationDocument::new("passport", 0.98, &[1, 2]),
            ClassificationDocument::new("license", 0.91, &[2, 3]),
        ]),
        extractor.clone(),
        storage.clone(),
    )
    .run(&pdf)
    .await
    .unwrap();

    let files = storage.files.lock().unwrap();
    let stored: Vec<(&str, &str, &[u8])> = files
        .iter()
        .map(|(d, f, b)| (d.as_str(), f.as_str(), b.as_slice()))
        .collect();
    assert_eq!(
        stored,
        vec![
            ("Passport", "doc_passport.pdf", &b"%PDF-single page 1"[..]),
            ("Passport", "doc_passport_2.pdf", &b"%PDF-single page 2"[..]),
            ("License", "doc_license.pdf", &b"%PDF-single page 3"[..]),
        ]
    );
    assert_eq!(
        report.events,
        vec![SkipEvent::DuplicatePageClaim {
            page: 2,
            doc_type: "license".into(),
            claimed_by: "passport".into(),
        }]
    );
    assert!(report.is_complete());
    assert_eq!(extractor.opened.load(Ordering::SeqCst), 1);
    assert_eq!(extractor.live.load(Ordering::SeqCst), 0);
    assert_eq!(*storage.folders.lock().unwrap(), vec!["Passport", "License"]);
}

#[tokio::test]
async fn unrecognized_types_are_skipped_case_insensitively() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "intake.pdf");
    let storage = Arc::new(RecordingStorage::default());

    let report = pipeline(
        config(),
        CannedClassifier::new(vec![
            ClassificationDocument::new("Invoice", 0.7, &[1]),
            ClassificationDocument::new("PASSPORT", 0.9, &[2]),
        ]),
        SyntheticExtractor::new(2),
        storage.clone(),
    )
    .run(&pdf)
    .await
    .unwrap();

    assert_eq!(report.uploads.len(), 1);
    assert_eq!(report.uploads[0].filename, "intake_passport.pdf");
    assert_eq!(report.uploads[0].page, 2);
    assert!(matches!(
        &report.events[0],
        SkipEvent::UnrecognizedDocumentType { doc_type, pages } if doc_type == "invoice" && pages == &[1]
    ));
}

#[tokio::test]
async fn empty_classification_uploads_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "doc.pdf");
    let storage = Arc::new(RecordingStorage::default());
    let extractor = SyntheticExtractor::new(4);

    let report = pipeline(
        config(),
        CannedClassifier::new(vec![]),
        extractor.clone(),
        storage.clone(),
    )
    .run(&pdf)
    .await
    .unwrap();

    assert_eq!(report.artifacts, 0);
    assert!(report.uploads.is_empty());
    assert!(report.events.is_empty());
    assert_eq!(extractor.opened.load(Ordering::SeqCst), 0);
    assert!(storage.folders.lock().unwrap().is_empty());
}

#[tokio::test]
async fn broken_page_is_skipped_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "doc.pdf");
    let storage = Arc::new(RecordingStorage::default());
    let extractor = SyntheticExtractor::with_broken(3, &[1]);

    let report = pipeline(
        config(),
        CannedClassifier::new(vec![ClassificationDocument::new(
            "license",
            0.9,
            &[1, 2, 3],
        )]),
        extractor.clone(),
        storage.clone(),
    )
    .run(&pdf)
    .await
    .unwrap();

    let names: Vec<_> = report.uploads.iter().map(|u| u.filename.as_str()).collect();
    assert_eq!(names, vec!["doc_license.pdf", "doc_license_2.pdf"]);
    assert_eq!(report.uploads[1].page, 3);
    assert!(matches!(
        &report.events[0],
        SkipEvent::ExtractionFailed { page: 2, .. }
    ));
    assert_eq!(extractor.live.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn broken_page_aborts_under_abort_policy() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "doc.pdf");
    let storage = Arc::new(RecordingStorage::default());
    let extractor = SyntheticExtractor::with_broken(3, &[1]);
    let config = SplitConfig::builder()
        .classifier_id("id-triage")
        .page_failure_policy(PageFailurePolicy::Abort)
        .build()
        .unwrap();

    let err = pipeline(
        config,
        CannedClassifier::new(vec![ClassificationDocument::new("license", 0.9, &[1, 2])]),
        extractor.clone(),
        storage.clone(),
    )
    .run(&pdf)
    .await
    .unwrap_err();

    assert!(matches!(err, PdfSplitError::PageExtractionFailed { page: 2, .. }));
    assert!(storage.files.lock().unwrap().is_empty());
    assert_eq!(extractor.live.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn page_past_the_end_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "doc.pdf");

    let report = pipeline(
        config(),
        CannedClassifier::new(vec![ClassificationDocument::new("passport", 0.9, &[1, 9])]),
        SyntheticExtractor::new(2),
        Arc::new(RecordingStorage::default()),
    )
    .run(&pdf)
    .await
    .unwrap();

    assert_eq!(report.uploads.len(), 1);
    assert!(matches!(
        &report.events[0],
        SkipEvent::ExtractionFailed { page: 9, .. }
    ));
}

#[tokio::test]
async fn rejected_upload_does_not_stop_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "doc.pdf");
    let storage = Arc::new(RecordingStorage::default());
    storage
        .reject
        .lock()
        .unwrap()
        .insert("doc_passport.pdf".into());

    let report = pipeline(
        config(),
        CannedClassifier::new(vec![
            ClassificationDocument::new("passport", 0.9, &[1]),
            ClassificationDocument::new("license", 0.9, &[2]),
        ]),
        SyntheticExtractor::new(2),
        storage.clone(),
    )
    .run(&pdf)
    .await
    .unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.uploads.len(), 1);
    assert_eq!(report.uploads[0].filename, "doc_license.pdf");
    assert!(matches!(
        &report.failures[0],
        UploadFailure::UploadFailed { filename, .. } if filename == "doc_passport.pdf"
    ));
}

#[tokio::test]
async fn not_a_pdf_stops_before_classification() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.pdf");
    std::fs::write(&path, b"hello world").unwrap();
    let classifier = CannedClassifier::new(vec![]);

    let err = pipeline(
        config(),
        classifier.clone(),
        SyntheticExtractor::new(1),
        Arc::new(RecordingStorage::default()),
    )
    .run(&path)
    .await
    .unwrap_err();

    assert!(matches!(err, PdfSplitError::NotAPdf { .. }));
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn progress_callback_sees_each_stage() {
    #[derive(Default)]
    struct Stages(Mutex<Vec<String>>);

    impl SplitProgressCallback for Stages {
        fn on_classified(&self, documents: usize) {
            self.0.lock().unwrap().push(format!("classified {documents}"));
        }
        fn on_partitioned(&self, artifacts: usize, events: &[SkipEvent]) {
            self.0
                .lock()
                .unwrap()
                .push(format!("partitioned {artifacts} {}", events.len()));
        }
        fn on_upload_complete(&self, filename: &str, _folder: &str) {
            self.0.lock().unwrap().push(format!("uploaded {filename}"));
        }
        fn on_run_complete(&self, uploaded: usize, failed: usize) {
            self.0
                .lock()
                .unwrap()
                .push(format!("complete {uploaded} {failed}"));
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "doc.pdf");
    let stages = Arc::new(Stages::default());
    let config = SplitConfig::builder()
        .classifier_id("id-triage")
        .progress_callback(stages.clone())
        .build()
        .unwrap();

    pipeline(
        config,
        CannedClassifier::new(vec![ClassificationDocument::new("passport", 0.9, &[1, 1])]),
        SyntheticExtractor::new(1),
        Arc::new(RecordingStorage::default()),
    )
    .run(&pdf)
    .await
    .unwrap();

    assert_eq!(
        *stages.0.lock().unwrap(),
        vec![
            "classified 1",
            "partitioned 1 1",
            "uploaded doc_passport.pdf",
            "complete 1 0",
        ]
    );
}

#[test]
fn report_serialises_to_json() {
    let report = edgequake_pdfsplit::RunReport {
        base_name: "doc".into(),
        events: vec![SkipEvent::InvalidPageNumber {
            page_number: 0,
            doc_type: "passport".into(),
        }],
        ..Default::default()
    };
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["base_name"], "doc");
    assert_eq!(json["events"][0]["kind"], "invalid_page_number");
}
