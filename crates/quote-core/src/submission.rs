//! Submission data model

use std::collections::BTreeMap;

/// Largest accepted size of a single uploaded file (4 MiB)
pub const MAX_ATTACHMENT_BYTES: usize = 4 * 1024 * 1024;

/// Raw form fields as received, keyed by form field name.
///
/// Unknown keys are kept so the persisted snapshot matches what the client sent.
pub type FormFields = BTreeMap<String, String>;

/// A file uploaded alongside the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Filename as supplied by the client
    pub original_name: String,

    /// Declared MIME type
    pub content_type: String,

    /// File contents
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(
        original_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            content_type: content_type.into(),
            data,
        }
    }
}

/// One quote request: form fields plus uploaded drawings in upload order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    pub fields: FormFields,
    pub attachments: Vec<UploadedFile>,
}

impl Submission {
    pub fn new(fields: FormFields, attachments: Vec<UploadedFile>) -> Self {
        Self {
            fields,
            attachments,
        }
    }

    /// Raw value of a field, if the client sent it
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Trimmed value of a field, `None` when absent or blank
    pub fn trimmed(&self, key: &str) -> Option<&str> {
        self.field(key).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Original filenames of the uploads, in upload order
    pub fn attachment_names(&self) -> Vec<String> {
        self.attachments
            .iter()
            .map(|file| file.original_name.clone())
            .collect()
    }
}
