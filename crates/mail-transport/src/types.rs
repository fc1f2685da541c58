//! Outgoing message types

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL_SHAPE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

/// Syntactic `localpart@domain.tld` check. Surrounding whitespace is ignored.
pub fn is_valid_email(address: &str) -> bool {
    EMAIL_SHAPE.is_match(address.trim())
}

/// File attached to an outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl MailAttachment {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
        }
    }
}

/// A plain-text email with attachments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    /// Only ever holds an address that passed [`is_valid_email`]
    reply_to: Option<String>,
    pub attachments: Vec<MailAttachment>,
}

impl MailMessage {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            subject: subject.into(),
            text: text.into(),
            reply_to: None,
            attachments: Vec::new(),
        }
    }

    /// Set reply-to if the candidate looks like an email address; otherwise leave it unset
    pub fn with_reply_to(mut self, candidate: Option<&str>) -> Self {
        self.reply_to = candidate
            .map(str::trim)
            .filter(|address| is_valid_email(address))
            .map(str::to_string);
        self
    }

    pub fn with_attachment(mut self, attachment: MailAttachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }
}
