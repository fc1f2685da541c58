//! PDF rendering of quote submissions
//!
//! Rendering happens in two steps:
//!
//! 1. [`layout_quote`] turns the fields and upload names into a flat list of
//!    [`Block`]s (title, timestamp, four field sections, uploaded drawings).
//! 2. [`pdf::paint`] lays the blocks out on A4 pages with lopdf.
//!
//! [`PdfRenderer`] runs the painter on the blocking pool and resolves only once
//! the whole document has been written, so callers never see a partial PDF.

mod pdf;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::debug;

use crate::fields::{defaulted_value, SECTIONS};
use crate::submission::{FormFields, Submission};

pub use pdf::paint;

/// Document title line
pub const DOCUMENT_TITLE: &str = "AgriBuild Quote Request";

/// Heading of the uploads section
pub const UPLOADS_HEADING: &str = "Uploaded Drawings";

/// Line shown when nothing was uploaded
pub const NO_UPLOADS: &str = "No files uploaded.";

/// Rendering errors
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("Render task failed: {0}")]
    Task(String),
}

/// A finished PDF. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    bytes: Vec<u8>,
}

impl RenderedDocument {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Turns a submission into a document
#[async_trait]
pub trait DocumentRenderer: Send + Sync + 'static {
    async fn render(&self, submission: &Submission) -> Result<RenderedDocument, RenderError>;
}

/// One visual element of the quote document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Large title line
    Title(String),
    /// Muted metadata line (submission timestamp)
    Meta(String),
    /// Section heading
    Heading(String),
    /// Bold label followed by its (defaulted) value
    Field { label: String, value: String },
    /// Plain body text
    Text(String),
    /// Vertical gap, in multiples of the body line height
    Gap(u8),
}

/// en-GB style timestamp, e.g. `05 Mar 2026, 09:41`
pub fn format_submitted_at(at: &DateTime<Local>) -> String {
    at.format("%d %b %Y, %H:%M").to_string()
}

/// Lay out the quote document.
///
/// Every section field is present; blank values become "Not provided".
pub fn layout_quote(
    fields: &FormFields,
    attachment_names: &[String],
    submitted_at: &DateTime<Local>,
) -> Vec<Block> {
    let mut blocks = vec![
        Block::Title(DOCUMENT_TITLE.to_string()),
        Block::Meta(format!("Submitted: {}", format_submitted_at(submitted_at))),
        Block::Gap(1),
    ];

    for section in SECTIONS {
        blocks.push(Block::Heading(section.title.to_string()));
        for spec in section.fields {
            blocks.push(Block::Field {
                label: spec.label.to_string(),
                value: defaulted_value(fields.get(spec.key).map(String::as_str)),
            });
        }
        blocks.push(Block::Gap(1));
    }

    blocks.push(Block::Heading(UPLOADS_HEADING.to_string()));
    if attachment_names.is_empty() {
        blocks.push(Block::Text(NO_UPLOADS.to_string()));
    } else {
        blocks.extend(
            attachment_names
                .iter()
                .enumerate()
                .map(|(index, name)| Block::Text(format!("{}. {}", index + 1, name))),
        );
    }

    blocks
}

/// lopdf-backed renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer;

impl PdfRenderer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentRenderer for PdfRenderer {
    async fn render(&self, submission: &Submission) -> Result<RenderedDocument, RenderError> {
        let blocks = layout_quote(
            &submission.fields,
            &submission.attachment_names(),
            &Local::now(),
        );

        let bytes = tokio::task::spawn_blocking(move || paint(&blocks))
            .await
            .map_err(|join_error| RenderError::Task(join_error.to_string()))??;

        debug!(bytes = bytes.len(), "Rendered quote PDF");
        Ok(RenderedDocument::new(bytes))
    }
}
