//! Mail delivery for quote requests
//!
//! One capability, "send an email with attachments from A to B", with two
//! interchangeable backends:
//!
//! - [`GraphTransport`] - client-credentials token from Microsoft identity, then
//!   `POST /users/{mailbox}/sendMail` on Microsoft Graph
//! - [`SmtpTransport`] - authenticated SMTP submission via lettre
//!
//! ## Selection
//!
//! [`MailSettings::select_transport`] picks the backend from configuration:
//!
//! 1. Graph, when tenant id, client id and client secret are all set
//! 2. SMTP, when both username and password are set
//! 3. Nothing otherwise
//!
//! A partial Graph credential set is a configuration error rather than a silent
//! fall back to SMTP.
//!
//! ## Environment Variables
//!
//! | Variable | Used for |
//! |----------|----------|
//! | `GRAPH_TENANT_ID`, `GRAPH_CLIENT_ID`, `GRAPH_CLIENT_SECRET` | Graph credentials |
//! | `GRAPH_AUTHORITY_URL`, `GRAPH_API_URL` | Graph endpoints for national clouds (default: global) |
//! | `APP_MAILBOX` | Sender mailbox (Graph send endpoint) |
//! | `SMTP_HOST`, `SMTP_PORT`, `SMTP_SECURE` | SMTP server (default `smtp.office365.com:587`) |
//! | `SMTP_USER`, `SMTP_PASS`, `SMTP_FROM` | SMTP credentials and sender |
//! | `FORWARD_TO`, `MAIL_TO` | Recipient |

pub mod config;
pub mod graph;
pub mod smtp;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod transport;
pub mod types;

pub use config::{GraphConfig, MailSettings, SmtpConfig, TransportConfig};
pub use graph::GraphTransport;
pub use smtp::SmtpTransport;
pub use transport::{send_with_timeout, Mailer, Transport};
pub use types::{is_valid_email, MailAttachment, MailMessage};

use std::time::Duration;

use thiserror::Error;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Mail errors.
///
/// `Config`, `Token`, `PermissionDenied` and `SendRejected` carry messages
/// written for the operator who has to fix the setup.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail configuration error: {0}")]
    Config(String),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),

    #[error("{0}")]
    Token(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{message}")]
    SendRejected { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Mail send timed out after {0:?}")]
    Timeout(Duration),
}
