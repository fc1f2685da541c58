//! Submission pipeline
//!
//! ```text
//! select transport ──► render ──► persist ──► deliver
//!        │                │          │           │
//!        └── 500 ─────────┴── 500 ───┘           └── never fatal: emailed = false
//! ```
//!
//! Everything up to and including persistence is a hard failure. Once the
//! record is on disk the caller gets their reference whatever happens to the
//! email.

use std::time::Duration;

use mail_transport::{
    is_valid_email, send_with_timeout, MailAttachment, MailMessage, MailSettings, Transport,
    TransportConfig,
};
use quote_core::{build_summary, RenderError, RenderedDocument, Submission, SubmissionId};
use tracing::{debug, error, info, instrument, warn};

use crate::error::SubmissionError;
use crate::negotiate::{Reply, ResponseFormat};
use crate::AppState;

pub const SUBJECT_PREFIX: &str = "New quote request";
pub const SENT_MESSAGE: &str = "Thanks! Your quote request has been sent.";
pub const RECEIVED_MESSAGE: &str = "Thanks! Your quote request has been received.";

/// What happened to the notification email of a stored submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { transport: &'static str },
    SkippedNoTransport,
    SkippedInvalidAddress,
    DeliveryError(String),
}

impl DeliveryOutcome {
    pub fn emailed(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// A stored submission and the fate of its email
#[derive(Debug)]
pub struct Receipt {
    pub reference: SubmissionId,
    pub delivery: DeliveryOutcome,
}

impl Receipt {
    pub fn message(&self) -> String {
        let lead = if self.delivery.emailed() {
            SENT_MESSAGE
        } else {
            RECEIVED_MESSAGE
        };
        format!("{} Reference: {}", lead, self.reference)
    }

    pub fn into_reply(self, format: ResponseFormat) -> Reply {
        Reply::success(format, self.message())
            .with("reference", self.reference.to_string())
            .with("emailed", self.delivery.emailed())
    }
}

/// `New quote request: {first} {last}` with only the provided name parts
pub fn subject_line(submission: &Submission) -> String {
    let name: Vec<&str> = ["first_name", "last_name"]
        .into_iter()
        .filter_map(|key| submission.trimmed(key))
        .collect();

    if name.is_empty() {
        SUBJECT_PREFIX.to_string()
    } else {
        format!("{}: {}", SUBJECT_PREFIX, name.join(" "))
    }
}

/// The notification email: summary body, rendered PDF first, then the uploads in order
pub fn build_message(
    from: &str,
    to: &str,
    submission: &Submission,
    document: &RenderedDocument,
    summary: &str,
    reference: &SubmissionId,
) -> MailMessage {
    let mut message = MailMessage::new(
        from.trim(),
        to.trim(),
        subject_line(submission),
        format!("{}\n\nReference: {}", summary, reference),
    )
    .with_reply_to(submission.field("email"))
    .with_attachment(MailAttachment::new(
        format!("quote-request-{}.pdf", reference),
        "application/pdf",
        document.as_bytes().to_vec(),
    ));

    for file in &submission.attachments {
        message = message.with_attachment(MailAttachment::new(
            file.original_name.clone(),
            file.content_type.clone(),
            file.data.clone(),
        ));
    }
    message
}

/// Run one submission through the pipeline
#[instrument(skip_all, fields(attachments = submission.attachments.len()))]
pub async fn process(state: &AppState, submission: Submission) -> Result<Receipt, SubmissionError> {
    let transport = state
        .mail
        .select_transport()
        .map_err(SubmissionError::Configuration)?;

    let document = state.renderer.render(&submission).await?;
    if document.is_empty() {
        return Err(RenderError::Pdf("renderer produced an empty document".to_string()).into());
    }
    debug!(bytes = document.len(), "Rendered quote document");
    let summary = build_summary(&submission.fields);
    let reference = state.store.save(&submission, &document, &summary).await?;

    let delivery = match transport {
        None => DeliveryOutcome::SkippedNoTransport,
        Some(transport) => {
            deliver(
                &state.mail,
                &transport,
                state.mail_timeout,
                &submission,
                &document,
                &summary,
                &reference,
            )
            .await
        }
    };

    match &delivery {
        DeliveryOutcome::Delivered { transport } => {
            info!(submission_id = %reference, transport, "Quote request emailed")
        }
        DeliveryOutcome::SkippedNoTransport => {
            warn!(submission_id = %reference, "No mail transport configured; saved only")
        }
        DeliveryOutcome::SkippedInvalidAddress => warn!(
            submission_id = %reference,
            sender = ?state.mail.sender(),
            recipient = ?state.mail.recipient(),
            "Sender or recipient address is not valid; saved only"
        ),
        DeliveryOutcome::DeliveryError(detail) => {
            error!(submission_id = %reference, error = %detail, "Email delivery failed; saved only")
        }
    }

    Ok(Receipt {
        reference,
        delivery,
    })
}

/// One send attempt. Every failure is folded into the outcome.
pub async fn deliver(
    settings: &MailSettings,
    transport: &TransportConfig,
    timeout: Duration,
    submission: &Submission,
    document: &RenderedDocument,
    summary: &str,
    reference: &SubmissionId,
) -> DeliveryOutcome {
    let (Some(from), Some(to)) = (settings.sender(), settings.recipient()) else {
        return DeliveryOutcome::SkippedInvalidAddress;
    };
    if !is_valid_email(from) || !is_valid_email(to) {
        return DeliveryOutcome::SkippedInvalidAddress;
    }

    let message = build_message(from, to, submission, document, summary, reference);
    let mailer = match Transport::from_config(transport, timeout) {
        Ok(mailer) => mailer,
        Err(err) => return DeliveryOutcome::DeliveryError(err.to_string()),
    };

    match send_with_timeout(&mailer, &message, timeout).await {
        Ok(()) => DeliveryOutcome::Delivered {
            transport: mailer.name(),
        },
        Err(err) => DeliveryOutcome::DeliveryError(err.to_string()),
    }
}
