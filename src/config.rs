//! Configuration types for classify-and-split runs.
//!
//! All run behaviour is controlled through [`SplitConfig`], built via its
//! [`SplitConfigBuilder`]. The config is handed to the pipeline at
//! construction time; nothing in the crate reads ambient global settings.
//!
//! Service credentials live with the collaborators that use them
//! ([`crate::classifier::AzureClassifierConfig`],
//! [`crate::storage::GraphStorageConfig`]), so a run that only needs a local
//! output directory never has to carry SharePoint secrets around.

use crate::error::PdfSplitError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

/// Document types split out when none are configured.
pub const DEFAULT_RECOGNIZED_TYPES: [&str; 2] = ["passport", "license"];

/// Configuration for a classify → split → upload run.
///
/// # Example
/// ```rust
/// use edgequake_pdfsplit::SplitConfig;
///
/// let config = SplitConfig::builder()
///     .classifier_id("id-triage-v2")
///     .recognized_type("visa")
///     .storage_target("visa", "Visa")
///     .build()
///     .unwrap();
/// assert!(config.recognized_types.contains("visa"));
/// ```
#[derive(Clone)]
pub struct SplitConfig {
    /// Identifier of the trained classifier model. Opaque to this crate.
    pub classifier_id: String,

    /// Lower-cased document types that produce artifacts. Default: `{passport, license}`.
    pub recognized_types: BTreeSet<String>,

    /// Destination folder per document type, relative to the storage root.
    /// Default: `passport → Passport`, `license → License`.
    pub storage_targets: BTreeMap<String, String>,

    /// What to do when a single claimed page cannot be extracted. Default: [`PageFailurePolicy::Skip`].
    pub page_failure_policy: PageFailurePolicy,

    /// PDF user password for encrypted source documents.
    pub password: Option<String>,

    /// Directory containing the pdfium shared library. If None, the working
    /// directory and then the system library path are tried.
    pub pdfium_library_path: Option<PathBuf>,

    /// Optional observer for pipeline events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        let recognized_types = DEFAULT_RECOGNIZED_TYPES
            .iter()
            .map(|t| t.to_string())
            .collect();
        let storage_targets = [("passport", "Passport"), ("license", "License")]
            .into_iter()
            .map(|(t, p)| (t.to_string(), p.to_string()))
            .collect();

        Self {
            classifier_id: String::new(),
            recognized_types,
            storage_targets,
            page_failure_policy: PageFailurePolicy::default(),
            password: None,
            pdfium_library_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SplitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitConfig")
            .field("classifier_id", &self.classifier_id)
            .field("recognized_types", &self.recognized_types)
            .field("storage_targets", &self.storage_targets)
            .field("page_failure_policy", &self.page_failure_policy)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn SplitProgressCallback>"),
            )
            .finish()
    }
}

impl SplitConfig {
    /// Create a new builder for `SplitConfig`.
    pub fn builder() -> SplitConfigBuilder {
        SplitConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SplitConfig`].
#[derive(Debug)]
pub struct SplitConfigBuilder {
    config: SplitConfig,
}

impl SplitConfigBuilder {
    pub fn classifier_id(mut self, id: impl Into<String>) -> Self {
        self.config.classifier_id = id.into();
        self
    }

    /// Replace the recognized set. Types are lower-cased.
    pub fn recognized_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.recognized_types = types
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    /// Add one type to the recognized set.
    pub fn recognized_type(mut self, doc_type: impl AsRef<str>) -> Self {
        self.config
            .recognized_types
            .insert(doc_type.as_ref().trim().to_lowercase());
        self
    }

    /// Map a document type to a destination folder. Leading/trailing slashes
    /// are stripped.
    pub fn storage_target(mut self, doc_type: impl AsRef<str>, folder: impl AsRef<str>) -> Self {
        self.config.storage_targets.insert(
            doc_type.as_ref().trim().to_lowercase(),
            normalize_folder(folder.as_ref()),
        );
        self
    }

    pub fn page_failure_policy(mut self, policy: PageFailurePolicy) -> Self {
        self.config.page_failure_policy = policy;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SplitConfig, PdfSplitError> {
        let c = &self.config;
        if c.classifier_id.trim().is_empty() {
            return Err(PdfSplitError::InvalidConfig(
                "Classifier id must not be empty".into(),
            ));
        }
        if c.recognized_types.is_empty() {
            return Err(PdfSplitError::InvalidConfig(
                "At least one recognized document type is required".into(),
            ));
        }
        let missing: Vec<&str> = c
            .recognized_types
            .iter()
            .filter(|t| !c.storage_targets.contains_key(*t))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(PdfSplitError::InvalidConfig(format!(
                "No storage target for recognized type(s): {}",
                missing.join(", ")
            )));
        }
        if let Some((t, _)) = c.storage_targets.iter().find(|(_, f)| f.is_empty()) {
            return Err(PdfSplitError::InvalidConfig(format!(
                "Storage target for '{t}' must not be empty"
            )));
        }
        Ok(self.config)
    }
}

/// Trim whitespace and surrounding slashes, and turn backslashes into `/`.
pub(crate) fn normalize_folder(folder: &str) -> String {
    folder.trim().replace('\\', "/").trim_matches('/').to_string()
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How a failure to extract one claimed page affects the run.
///
/// An unreadable *source* document is always fatal; this only governs pages
/// that exist in the classifier output but cannot be copied out (page number
/// past the end of the document, pdfium copy/save error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageFailurePolicy {
    /// Record a [`crate::error::SkipEvent::ExtractionFailed`] and continue. (default)
    #[default]
    Skip,
    /// Abort the whole partitioning with a fatal error; no artifacts are returned.
    Abort,
}
