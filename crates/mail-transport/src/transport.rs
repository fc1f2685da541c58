//! The send capability shared by both backends

use std::time::Duration;

use async_trait::async_trait;

use crate::config::TransportConfig;
use crate::graph::GraphTransport;
use crate::smtp::SmtpTransport;
use crate::types::MailMessage;
use crate::MailError;

/// Async email sending.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one message. A single attempt; no retries.
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// A ready-to-use transport built from a [`TransportConfig`]
#[derive(Clone)]
pub enum Transport {
    Graph(GraphTransport),
    Smtp(SmtpTransport),
}

impl Transport {
    pub fn from_config(config: &TransportConfig, timeout: Duration) -> Result<Self, MailError> {
        match config {
            TransportConfig::Graph(graph) => {
                Ok(Transport::Graph(GraphTransport::new(graph.clone(), timeout)?))
            }
            TransportConfig::Smtp(smtp) => Ok(Transport::Smtp(SmtpTransport::new(smtp, timeout)?)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transport::Graph(_) => "graph",
            Transport::Smtp(_) => "smtp",
        }
    }
}

#[async_trait]
impl Mailer for Transport {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        match self {
            Transport::Graph(graph) => graph.send(message).await,
            Transport::Smtp(smtp) => smtp.send(message).await,
        }
    }
}

/// Send with an overall deadline covering every network call of the attempt
pub async fn send_with_timeout(
    mailer: &dyn Mailer,
    message: &MailMessage,
    timeout: Duration,
) -> Result<(), MailError> {
    tokio::time::timeout(timeout, mailer.send(message))
        .await
        .map_err(|_| MailError::Timeout(timeout))?
}
