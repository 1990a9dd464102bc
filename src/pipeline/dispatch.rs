//! Upload dispatch: name each artifact, resolve its folder, store it.
//!
//! Artifacts are consumed in creation order, one at a time. A failure on one
//! artifact is recorded and the next artifact is still attempted; nothing
//! already stored is rolled back. Each distinct folder is ensured at most
//! once per dispatcher as long as ensuring it succeeds.

use crate::error::UploadFailure;
use crate::model::{SplitArtifact, UploadRecord};
use crate::pipeline::naming::ArtifactNamer;
use crate::progress::ProgressCallback;
use crate::storage::RemoteStorage;
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

/// Outcome of dispatching one run's artifacts.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub uploads: Vec<UploadRecord>,
    pub failures: Vec<UploadFailure>,
}

/// Stores artifacts in per-type folders of a [`RemoteStorage`].
pub struct UploadDispatcher<'a> {
    storage: &'a dyn RemoteStorage,
    targets: &'a BTreeMap<String, String>,
    progress: Option<ProgressCallback>,
    ensured: HashSet<String>,
}

impl<'a> UploadDispatcher<'a> {
    /// `targets` maps a lower-cased document type to its folder.
    pub fn new(storage: &'a dyn RemoteStorage, targets: &'a BTreeMap<String, String>) -> Self {
        Self {
            storage,
            targets,
            progress: None,
            ensured: HashSet::new(),
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Name and store `artifacts` in order, using `namer` for filenames.
    pub async fn dispatch(
        &mut self,
        namer: &mut ArtifactNamer,
        artifacts: Vec<SplitArtifact>,
    ) -> DispatchReport {
        let total = artifacts.len();
        let mut report = DispatchReport::default();

        for (i, artifact) in artifacts.into_iter().enumerate() {
            let filename = namer.next_name(&artifact.doc_type);
            info!("Preparing to upload {}...", filename);
            if let Some(cb) = &self.progress {
                cb.on_upload_start(i + 1, total, &filename);
            }

            match self.store(&filename, artifact).await {
                Ok(record) => {
                    info!("Successfully uploaded {} to {}", record.filename, record.folder);
                    if let Some(cb) = &self.progress {
                        cb.on_upload_complete(&record.filename, &record.folder);
                    }
                    report.uploads.push(record);
                }
                Err(failure) => {
                    warn!("{}", failure);
                    if let Some(cb) = &self.progress {
                        cb.on_upload_error(failure.filename(), &failure.to_string());
                    }
                    report.failures.push(failure);
                }
            }
        }

        report
    }

    async fn store(
        &mut self,
        filename: &str,
        artifact: SplitArtifact,
    ) -> Result<UploadRecord, UploadFailure> {
        let folder = match self.targets.get(&artifact.doc_type) {
            Some(folder) => folder.clone(),
            None => {
                return Err(UploadFailure::NoStorageTarget {
                    filename: filename.to_string(),
                    doc_type: artifact.doc_type,
                })
            }
        };
        let failed = |reason: String| UploadFailure::UploadFailed {
            filename: filename.to_string(),
            folder: folder.clone(),
            reason,
        };

        if !self.ensured.contains(&folder) {
            self.storage
                .ensure_folder(&folder)
                .await
                .map_err(|e| failed(e.to_string()))?;
            self.ensured.insert(folder.clone());
        }

        let size_bytes = artifact.bytes.len();
        let location = self
            .storage
            .upload(&folder, filename, artifact.bytes)
            .await
            .map_err(|e| failed(e.to_string()))?;

        Ok(UploadRecord {
            filename: filename.to_string(),
            folder: folder.clone(),
            doc_type: artifact.doc_type,
            page: artifact.page_index + 1,
            size_bytes,
            location,
        })
    }
}
