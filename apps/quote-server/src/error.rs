//! Hard failures of a quote submission

use axum::http::StatusCode;
use mail_transport::MailError;
use quote_core::{RenderError, StoreError};
use thiserror::Error;

use crate::negotiate::{Reply, ResponseFormat};

/// Shown for failures whose detail stays in the logs
pub const GENERIC_FAILURE: &str = "Sorry, something went wrong saving your request.";

/// Errors that abort a submission before it is stored
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("mail configuration: {0}")]
    Configuration(#[source] MailError),

    #[error("attachment rejected: {0}")]
    Attachment(String),

    #[error("malformed form data: {0}")]
    Multipart(String),

    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error("persist failed: {0}")]
    Persist(#[from] StoreError),
}

impl SubmissionError {
    pub fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Text safe to show the caller
    pub fn public_message(&self) -> String {
        match self {
            SubmissionError::Configuration(err) => err.to_string(),
            SubmissionError::Attachment(detail) => detail.clone(),
            SubmissionError::Multipart(_)
            | SubmissionError::Render(_)
            | SubmissionError::Persist(_) => GENERIC_FAILURE.to_string(),
        }
    }

    pub fn into_reply(self, format: ResponseFormat) -> Reply {
        Reply::failure(format, self.status(), self.public_message())
    }
}
