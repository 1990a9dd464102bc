//! Artifact filenames.
//!
//! The first artifact of a type is named `{base}_{type}.pdf`; the Nth
//! (N > 1) is `{base}_{type}_{N}.pdf`. Counters are per type and per run, so
//! the same base name and the same ordered artifact sequence always produce
//! the same filenames.

use std::collections::HashMap;
use std::path::Path;

/// Per-run filename generator.
#[derive(Debug, Clone)]
pub struct ArtifactNamer {
    base: String,
    counts: HashMap<String, usize>,
}

impl ArtifactNamer {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            counts: HashMap::new(),
        }
    }

    /// Seed the base name from a source path (file name without extension).
    pub fn for_source(path: &Path) -> Self {
        Self::new(base_name(path))
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Filename for the next artifact of `doc_type`.
    pub fn next_name(&mut self, doc_type: &str) -> String {
        let n = self.counts.entry(doc_type.to_string()).or_insert(0);
        *n += 1;
        if *n == 1 {
            format!("{}_{}.pdf", self.base, doc_type)
        } else {
            format!("{}_{}_{}.pdf", self.base, doc_type, n)
        }
    }
}

/// File name of `path` without its final extension; `"document"` if the
/// path has no usable file name.
pub fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string())
}
