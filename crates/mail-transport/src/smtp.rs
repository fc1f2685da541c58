//! SMTP transport using lettre

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, instrument};

use crate::config::SmtpConfig;
use crate::transport::Mailer;
use crate::types::MailMessage;
use crate::MailError;

const OCTET_STREAM: &str = "application/octet-stream";

/// Authenticated SMTP sender
#[derive(Clone)]
pub struct SmtpTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl SmtpTransport {
    /// Build the transport.
    ///
    /// `secure` means implicit TLS. Otherwise the connection upgrades with
    /// STARTTLS when the server offers it and stays plaintext when it does not.
    pub fn new(config: &SmtpConfig, timeout: Duration) -> Result<Self, MailError> {
        let builder = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| MailError::Smtp(e.to_string()))?
        } else {
            let tls = TlsParameters::new(config.host.clone())
                .map_err(|e| MailError::Smtp(e.to_string()))?;
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .tls(Tls::Opportunistic(tls))
        };

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(timeout))
            .build();

        Ok(Self {
            transport,
            host: config.host.clone(),
        })
    }

    /// Build a multipart/mixed message: plain-text body, then attachments in order
    pub fn build_message(message: &MailMessage) -> Result<Message, MailError> {
        let mut builder = Message::builder()
            .from(parse_mailbox(&message.from)?)
            .to(parse_mailbox(&message.to)?)
            .subject(message.subject.clone());

        if let Some(reply_to) = message.reply_to() {
            builder = builder.reply_to(parse_mailbox(reply_to)?);
        }

        let mut body = MultiPart::mixed().singlepart(SinglePart::plain(message.text.clone()));
        for attachment in &message.attachments {
            let content_type = ContentType::parse(&attachment.content_type)
                .or_else(|_| ContentType::parse(OCTET_STREAM))
                .map_err(|e| MailError::Build(e.to_string()))?;
            body = body.singlepart(
                Attachment::new(attachment.filename.clone())
                    .body(attachment.data.clone(), content_type),
            );
        }

        builder
            .multipart(body)
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .trim()
        .parse()
        .map_err(|_| MailError::InvalidAddress(address.to_string()))
}

#[async_trait]
impl Mailer for SmtpTransport {
    #[instrument(skip(self, message), fields(host = %self.host, to = %message.to, subject = %message.subject))]
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        let email = Self::build_message(message)?;

        let response = self
            .transport
            .send(email)
            .await
            .map_err(|e| MailError::Smtp(e.to_string()))?;

        info!(code = %response.code(), "SMTP server accepted message");
        Ok(())
    }
}
