//! Quote request core
//!
//! Everything a quote submission goes through before it reaches a mail
//! transport:
//!
//! - [`fields`] - the fixed field table, line formatting and the plain-text summary
//! - [`document`] - the PDF rendering of a submission
//! - [`store`] - durable per-submission storage on the local filesystem
//!
//! ## Data flow
//!
//! ```text
//! Submission ─┬─> fields::build_summary ──────────────┐
//!             └─> DocumentRenderer::render ─> PDF ────┴─> SubmissionStore::save ─> SubmissionId
//! ```

pub mod document;
pub mod fields;
pub mod store;
pub mod submission;

pub use document::{DocumentRenderer, PdfRenderer, RenderError, RenderedDocument};
pub use fields::{build_summary, defaulted_value, format_line, FieldSpec, Section, NOT_PROVIDED};
pub use store::{sanitize_filename, StoreError, SubmissionId, SubmissionStore};
pub use submission::{FormFields, Submission, UploadedFile, MAX_ATTACHMENT_BYTES};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
