//! On-disk submission storage
//!
//! Layout under the storage root:
//!
//! ```text
//! <root>/<submission-id>/
//!     quote-request.pdf
//!     summary.txt
//!     submission.json
//!     attachments/
//!         01-<sanitized name>
//!         02-<sanitized name>
//! ```
//!
//! Artifacts are written into a hidden staging directory that is renamed into
//! place once every write succeeded, so an id handed back to the caller always
//! points at a complete record.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::document::RenderedDocument;
use crate::submission::Submission;

pub const DOCUMENT_FILE: &str = "quote-request.pdf";
pub const SUMMARY_FILE: &str = "summary.txt";
pub const FIELDS_FILE: &str = "submission.json";
pub const ATTACHMENTS_DIR: &str = "attachments";

lazy_static! {
    static ref UNSAFE_FILENAME_CHARS: Regex = Regex::new(r"[^A-Za-z0-9_.\- ]").unwrap();
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize form fields: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Reference handed back to the client for a stored submission.
///
/// Built from the UTC timestamp with `:` and `.` replaced so it is safe as a
/// directory name, plus an 8 hex digit random suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubmissionId(String);

impl SubmissionId {
    pub fn generate(now: DateTime<Utc>) -> Self {
        let stamp = now
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace([':', '.'], "-");
        let suffix: String = uuid::Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(8)
            .collect();
        Self(format!("{stamp}-{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Replace anything outside `[A-Za-z0-9_.- ]` with `_`; empty names become `file`
pub fn sanitize_filename(name: &str) -> String {
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(name, "_");
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.into_owned()
    }
}

/// `NN-<sanitized>` with a 1-based, two digit sequence number
pub fn attachment_filename(index: usize, original_name: &str) -> String {
    format!("{:02}-{}", index + 1, sanitize_filename(original_name))
}

/// Writes one directory per accepted submission under a root directory
#[derive(Debug, Clone)]
pub struct SubmissionStore {
    root: PathBuf,
}

impl SubmissionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a stored submission
    pub fn record_dir(&self, id: &SubmissionId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// Persist a submission and return its reference.
    ///
    /// Either all artifacts are written or the call fails and nothing is left
    /// under the id.
    #[instrument(skip_all, fields(attachments = submission.attachments.len()))]
    pub async fn save(
        &self,
        submission: &Submission,
        document: &RenderedDocument,
        summary: &str,
    ) -> Result<SubmissionId, StoreError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StoreError::io(&self.root, e))?;

        let id = SubmissionId::generate(Utc::now());
        let staging = self.root.join(format!(".{}.partial", id));
        let target = self.record_dir(&id);

        if let Err(err) = self.write_artifacts(&staging, submission, document, summary).await {
            if let Err(cleanup) = tokio::fs::remove_dir_all(&staging).await {
                warn!(path = %staging.display(), error = %cleanup, "Failed to remove partial submission");
            }
            return Err(err);
        }

        if let Err(err) = tokio::fs::rename(&staging, &target).await {
            if let Err(cleanup) = tokio::fs::remove_dir_all(&staging).await {
                warn!(path = %staging.display(), error = %cleanup, "Failed to remove partial submission");
            }
            return Err(StoreError::io(&target, err));
        }

        info!(submission_id = %id, path = %target.display(), "Stored submission");
        Ok(id)
    }

    async fn write_artifacts(
        &self,
        dir: &Path,
        submission: &Submission,
        document: &RenderedDocument,
        summary: &str,
    ) -> Result<(), StoreError> {
        // create_dir rather than create_dir_all: an existing directory means an id collision
        tokio::fs::create_dir(dir)
            .await
            .map_err(|e| StoreError::io(dir, e))?;

        write_file(&dir.join(DOCUMENT_FILE), document.as_bytes()).await?;
        write_file(&dir.join(SUMMARY_FILE), summary.as_bytes()).await?;

        let fields = serde_json::to_vec_pretty(&submission.fields)?;
        write_file(&dir.join(FIELDS_FILE), &fields).await?;

        let attachments = dir.join(ATTACHMENTS_DIR);
        tokio::fs::create_dir(&attachments)
            .await
            .map_err(|e| StoreError::io(&attachments, e))?;
        for (index, file) in submission.attachments.iter().enumerate() {
            let path = attachments.join(attachment_filename(index, &file.original_name));
            write_file(&path, &file.data).await?;
        }

        Ok(())
    }
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| StoreError::io(path, e))
}
