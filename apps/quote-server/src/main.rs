//! AgriBuild Quote Server
//!
//! Serves the quote request form and accepts its submissions:
//!
//! - `GET /` - the form page
//! - `POST /quote` - validate, render the PDF, store the record, email it
//! - `GET /thank-you` - confirmation page
//! - `GET /health` - liveness check
//!
//! Storage is the durability guarantee; email is a best-effort notification
//! through Microsoft Graph or SMTP, whichever is configured.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use mail_transport::MailSettings;
use quote_core::{DocumentRenderer, PdfRenderer, SubmissionStore};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod config;
mod error;
mod negotiate;
mod pipeline;
#[cfg(test)]
mod tests;

use config::{LogFormat, ServerConfig};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub mail: Arc<MailSettings>,
    pub renderer: Arc<dyn DocumentRenderer>,
    pub store: SubmissionStore,
    pub mail_timeout: Duration,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            mail: Arc::new(config.mail_settings()),
            renderer: Arc::new(PdfRenderer::new()),
            store: SubmissionStore::new(&config.submissions_dir),
            mail_timeout: config.mail_timeout(),
        }
    }
}

fn init_tracing(config: &ServerConfig) {
    let level = if config.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "quote_server={level},quote_core={level},mail_transport={level},tower_http=info"
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set
    let dotenv = dotenvy::dotenv();

    let config = ServerConfig::parse();
    init_tracing(&config);

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    let state = AppState::from_config(&config);

    match state.mail.select_transport() {
        Ok(Some(transport)) => info!(
            transport = transport.name(),
            sender = ?state.mail.sender(),
            recipient = ?state.mail.recipient(),
            "Mail transport configured"
        ),
        Ok(None) => warn!("No mail transport configured; submissions will be saved but not emailed"),
        Err(err) => warn!(error = %err, "Mail configuration is incomplete; submissions will fail until it is fixed"),
    }

    info!("Submissions directory: {}", state.store.root().display());
    let app = api::router(state, &config.static_dir);

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Static directory: {}", config.static_dir.display());

    axum::serve(listener, app).await?;

    Ok(())
}
