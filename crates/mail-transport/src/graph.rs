//! Microsoft Graph sendMail transport
//!
//! Two requests per message:
//!
//! 1. `POST {authority}/{tenant}/oauth2/v2.0/token` with the client-credentials grant
//! 2. `POST {api}/users/{sender}/sendMail` with the bearer token
//!
//! Graph answers a successful send with `202 Accepted`; any other status is a failure.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::GraphConfig;
use crate::transport::Mailer;
use crate::types::MailMessage;
use crate::MailError;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMailRequest<'a> {
    message: GraphMessage<'a>,
    save_to_sent_items: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphMessage<'a> {
    subject: &'a str,
    body: ItemBody<'a>,
    to_recipients: Vec<Recipient<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    reply_to: Vec<Recipient<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<FileAttachment<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemBody<'a> {
    content_type: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Recipient<'a> {
    email_address: Address<'a>,
}

#[derive(Serialize)]
struct Address<'a> {
    address: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileAttachment<'a> {
    #[serde(rename = "@odata.type")]
    odata_type: &'static str,
    name: &'a str,
    content_type: &'a str,
    content_bytes: String,
}

fn recipient(address: &str) -> Recipient<'_> {
    Recipient {
        email_address: Address { address },
    }
}

fn send_mail_request(message: &MailMessage) -> SendMailRequest<'_> {
    SendMailRequest {
        message: GraphMessage {
            subject: &message.subject,
            body: ItemBody {
                content_type: "Text",
                content: &message.text,
            },
            to_recipients: vec![recipient(&message.to)],
            reply_to: message.reply_to().map(recipient).into_iter().collect(),
            attachments: message
                .attachments
                .iter()
                .map(|attachment| FileAttachment {
                    odata_type: "#microsoft.graph.fileAttachment",
                    name: &attachment.filename,
                    content_type: &attachment.content_type,
                    content_bytes: BASE64.encode(&attachment.data),
                })
                .collect(),
        },
        save_to_sent_items: false,
    }
}

/// Graph API sender using app (client-credentials) authentication
#[derive(Debug, Clone)]
pub struct GraphTransport {
    client: Client,
    config: GraphConfig,
}

impl GraphTransport {
    /// Build a transport whose HTTP calls each give up after `timeout`
    pub fn new(config: GraphConfig, timeout: Duration) -> Result<Self, MailError> {
        let client = Client::builder()
            .user_agent(format!("mail-transport/{}", crate::VERSION))
            .timeout(timeout)
            .build()
            .map_err(|e| MailError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.config.authority_url, self.config.tenant_id
        )
    }

    /// sendMail endpoint for a mailbox, with the mailbox percent-encoded as one path segment
    pub fn send_url(&self, mailbox: &str) -> Result<Url, MailError> {
        let mut url = Url::parse(&self.config.api_url)
            .map_err(|e| MailError::Config(format!("Invalid Graph API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| MailError::Config("Graph API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["users", mailbox, "sendMail"]);
        Ok(url)
    }

    async fn fetch_token(&self) -> Result<String, MailError> {
        let response = self
            .client
            .post(self.token_url())
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("scope", self.config.scope.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body_preview(&body), "Graph token request failed");
            return Err(MailError::Token(format!(
                "Could not get a Microsoft Graph access token (status {}). Check GRAPH_TENANT_ID, GRAPH_CLIENT_ID and GRAPH_CLIENT_SECRET.",
                status.as_u16()
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            MailError::Token(format!(
                "Microsoft Graph token response could not be read: {}",
                e
            ))
        })?;

        token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                MailError::Token(
                    "Microsoft Graph token response had no access_token. Check the app registration's client credentials."
                        .to_string(),
                )
            })
    }
}

#[async_trait]
impl Mailer for GraphTransport {
    #[instrument(skip(self, message), fields(to = %message.to, subject = %message.subject))]
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        let url = self.send_url(&message.from)?;
        let token = self.fetch_token().await?;

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&send_mail_request(message))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status == StatusCode::ACCEPTED {
            info!(attachments = message.attachments.len(), "Graph accepted message");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), body = %body_preview(&body), "Graph sendMail failed");

        if status == StatusCode::FORBIDDEN {
            return Err(MailError::PermissionDenied(format!(
                "Microsoft Graph refused to send as {} (403). Grant the app the Mail.Send application permission with admin consent and check any application access policy on that mailbox.",
                message.from
            )));
        }

        Err(MailError::SendRejected {
            status: status.as_u16(),
            message: format!(
                "Microsoft Graph sendMail failed with status {}. Check APP_MAILBOX and the app registration.",
                status.as_u16()
            ),
        })
    }
}

fn map_transport_error(error: reqwest::Error) -> MailError {
    if error.is_timeout() {
        MailError::Http(format!("request timed out: {}", error))
    } else {
        MailError::Http(error.to_string())
    }
}

fn body_preview(body: &str) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 200;

    let compact = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{}...", compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>())
    } else {
        compact
    }
}
