//! Process configuration
//!
//! Every option can come from a flag or the environment (including a `.env`
//! file loaded before parsing). Values are read once at startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, ValueEnum};
use mail_transport::MailSettings;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Command-line arguments for the quote server
#[derive(Parser, Clone)]
#[command(name = "quote-server")]
#[command(about = "AgriBuild quote request server")]
pub struct ServerConfig {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Where submission records are written
    #[arg(long, env = "SUBMISSIONS_DIR", default_value = "submissions")]
    pub submissions_dir: PathBuf,

    /// Directory holding index.html, thank-you.html and other page assets
    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// Upper bound on one delivery attempt, in seconds
    #[arg(long, env = "MAIL_TIMEOUT_SECS", default_value = "30")]
    pub mail_timeout_secs: u64,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(flatten)]
    pub mail: MailArgs,
}

/// Mail transport options
#[derive(Args, Clone, Default)]
pub struct MailArgs {
    #[arg(long, env = "SMTP_HOST")]
    pub smtp_host: Option<String>,

    #[arg(long, env = "SMTP_PORT")]
    pub smtp_port: Option<u16>,

    /// `true` forces implicit TLS; port 465 implies it
    #[arg(long, env = "SMTP_SECURE")]
    pub smtp_secure: Option<String>,

    #[arg(long, env = "SMTP_USER")]
    pub smtp_user: Option<String>,

    #[arg(long, env = "SMTP_PASS", hide_env_values = true)]
    pub smtp_pass: Option<String>,

    #[arg(long, env = "SMTP_FROM")]
    pub smtp_from: Option<String>,

    #[arg(long, env = "MAIL_TO")]
    pub mail_to: Option<String>,

    #[arg(long, env = "FORWARD_TO")]
    pub forward_to: Option<String>,

    #[arg(long, env = "APP_MAILBOX")]
    pub app_mailbox: Option<String>,

    #[arg(long, env = "GRAPH_TENANT_ID")]
    pub graph_tenant_id: Option<String>,

    #[arg(long, env = "GRAPH_CLIENT_ID")]
    pub graph_client_id: Option<String>,

    #[arg(long, env = "GRAPH_CLIENT_SECRET", hide_env_values = true)]
    pub graph_client_secret: Option<String>,

    #[arg(long, env = "GRAPH_AUTHORITY_URL")]
    pub graph_authority_url: Option<String>,

    #[arg(long, env = "GRAPH_API_URL")]
    pub graph_api_url: Option<String>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    pub fn mail_timeout(&self) -> Duration {
        Duration::from_secs(self.mail_timeout_secs)
    }

    pub fn mail_settings(&self) -> MailSettings {
        self.mail.to_settings()
    }
}

impl MailArgs {
    pub fn to_settings(&self) -> MailSettings {
        MailSettings {
            smtp_host: self.smtp_host.clone(),
            smtp_port: self.smtp_port,
            smtp_secure: self
                .smtp_secure
                .as_deref()
                .is_some_and(|v| v.trim() == "true"),
            smtp_user: self.smtp_user.clone(),
            smtp_pass: self.smtp_pass.clone(),
            smtp_from: self.smtp_from.clone(),
            mail_to: self.mail_to.clone(),
            forward_to: self.forward_to.clone(),
            app_mailbox: self.app_mailbox.clone(),
            graph_tenant_id: self.graph_tenant_id.clone(),
            graph_client_id: self.graph_client_id.clone(),
            graph_client_secret: self.graph_client_secret.clone(),
            graph_authority_url: self.graph_authority_url.clone(),
            graph_api_url: self.graph_api_url.clone(),
        }
    }
}
