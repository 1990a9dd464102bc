//! Single-page extraction: copy one page of the source PDF into a new document.
//!
//! ## Why a scoped visitor?
//!
//! A pdfium document borrows the bound library, so neither can outlive the
//! other. [`PageExtractor::with_source`] binds, opens, hands the open source
//! to a visitor, and tears everything down in reverse order when the visitor
//! returns. Every exit path (success, visitor error, `?` inside the visitor)
//! releases the source handle and any single-page writer.
//!
//! pdfium is not async-safe; async callers run extraction inside
//! `tokio::task::spawn_blocking` (see [`crate::run`]).

use crate::error::PdfSplitError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// An open source document.
pub trait SourcePages {
    /// Number of pages in the source document.
    fn page_count(&self) -> usize;

    /// Copy the page at zero-based `index` into a new single-page PDF.
    fn extract_page(&mut self, index: usize) -> Result<Vec<u8>, PdfSplitError>;
}

/// Opens source documents for page extraction.
pub trait PageExtractor: Send + Sync {
    /// Open `source` and pass it to `visit`. The source is closed when this
    /// returns.
    ///
    /// # Errors
    /// [`PdfSplitError::SourceDocumentUnreadable`] if `source` cannot be
    /// parsed; otherwise whatever `visit` returns.
    fn with_source(
        &self,
        source: &[u8],
        password: Option<&str>,
        visit: &mut dyn FnMut(&mut dyn SourcePages) -> Result<(), PdfSplitError>,
    ) -> Result<(), PdfSplitError>;
}

/// pdfium-backed [`PageExtractor`].
///
/// Binds the library on every [`PageExtractor::with_source`] call; a bound
/// `Pdfium` never crosses a thread boundary.
#[derive(Debug, Clone, Default)]
pub struct PdfiumExtractor {
    library_path: Option<PathBuf>,
}

impl PdfiumExtractor {
    /// `library_path` is the directory holding the pdfium shared library.
    /// If None, `./` and then the system library path are tried.
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }

    /// Bind to the pdfium library.
    pub fn bind(&self) -> Result<Pdfium, PdfSplitError> {
        bind_pdfium(self.library_path.as_deref()).map(Pdfium::new)
    }

    /// Fail fast if pdfium cannot be bound, before any network call is made.
    pub fn check_available(&self) -> Result<(), PdfSplitError> {
        self.bind().map(|_| ())
    }
}

impl PageExtractor for PdfiumExtractor {
    fn with_source(
        &self,
        source: &[u8],
        password: Option<&str>,
        visit: &mut dyn FnMut(&mut dyn SourcePages) -> Result<(), PdfSplitError>,
    ) -> Result<(), PdfSplitError> {
        let pdfium = self.bind()?;

        let document = pdfium
            .load_pdf_from_byte_slice(source, password)
            .map_err(|e| load_error(e, password.is_some()))?;

        let mut pages = PdfiumSource {
            pdfium: &pdfium,
            document,
        };
        visit(&mut pages)
    }
}

struct PdfiumSource<'a> {
    pdfium: &'a Pdfium,
    document: PdfDocument<'a>,
}

impl SourcePages for PdfiumSource<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn extract_page(&mut self, index: usize) -> Result<Vec<u8>, PdfSplitError> {
        let failed = |detail: String| PdfSplitError::PageExtractionFailed {
            page: index + 1,
            detail,
        };

        let source_index =
            u16::try_from(index).map_err(|_| failed(format!("page index {index} too large")))?;

        let mut single = self
            .pdfium
            .create_new_pdf()
            .map_err(|e| failed(format!("{:?}", e)))?;

        single
            .pages_mut()
            .copy_page_from_document(&self.document, source_index, 0)
            .map_err(|e| failed(format!("{:?}", e)))?;

        let bytes = single
            .save_to_bytes()
            .map_err(|e| failed(format!("{:?}", e)))?;

        debug!("Extracted page {} → {} bytes", index + 1, bytes.len());
        Ok(bytes)
    }
}

fn bind_pdfium(
    library_path: Option<&Path>,
) -> Result<Box<dyn PdfiumLibraryBindings>, PdfSplitError> {
    let bindings = match library_path {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    };
    bindings.map_err(|e| PdfSplitError::PdfiumBindingFailed(format!("{:?}", e)))
}

fn load_error(e: PdfiumError, has_password: bool) -> PdfSplitError {
    let err_str = format!("{:?}", e);
    let detail = if err_str.contains("Password") || err_str.contains("password") {
        if has_password {
            "wrong password".to_string()
        } else {
            "document is encrypted and requires a password".to_string()
        }
    } else {
        err_str
    };
    PdfSplitError::SourceDocumentUnreadable { detail }
}
