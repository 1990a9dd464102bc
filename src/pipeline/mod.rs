//! Pipeline stages for classify → split → upload.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own with fakes for the classifier, pdfium and storage.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ (classifier) ──▶ partition ──▶ extract ──▶ naming ──▶ dispatch
//! (path)                     (plan)        (pdfium)    (counter)  (storage)
//! ```
//!
//! 1. [`input`]     — validate the path and read the source PDF
//! 2. [`partition`] — decide which page goes where (first claim wins,
//!    unrecognized types skipped), then execute the plan
//! 3. [`extract`]   — copy single pages out of the source; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 4. [`naming`]    — `{base}_{type}[_{n}].pdf`
//! 5. [`dispatch`]  — ensure folders and upload, isolating per-artifact failures

pub mod dispatch;
pub mod extract;
pub mod input;
pub mod naming;
pub mod partition;
