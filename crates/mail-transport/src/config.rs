//! Mail settings and transport selection

use std::fmt;

use crate::MailError;

pub const DEFAULT_SMTP_HOST: &str = "smtp.office365.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_GRAPH_AUTHORITY: &str = "https://login.microsoftonline.com";
pub const DEFAULT_GRAPH_API: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Raw mail options as loaded at startup. Blank strings count as unset.
#[derive(Clone, Default)]
pub struct MailSettings {
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_secure: bool,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,
    pub smtp_from: Option<String>,
    pub mail_to: Option<String>,
    pub forward_to: Option<String>,
    pub app_mailbox: Option<String>,
    pub graph_tenant_id: Option<String>,
    pub graph_client_id: Option<String>,
    pub graph_client_secret: Option<String>,
    /// Identity platform base, e.g. `https://login.microsoftonline.us`
    pub graph_authority_url: Option<String>,
    /// Graph API base, e.g. `https://graph.microsoft.us/v1.0`
    pub graph_api_url: Option<String>,
}

/// Microsoft Graph app credentials
#[derive(Clone)]
pub struct GraphConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// Identity platform base, overridable for tests
    pub authority_url: String,
    /// Graph API base, overridable for tests
    pub api_url: String,
    pub scope: String,
}

impl GraphConfig {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authority_url: DEFAULT_GRAPH_AUTHORITY.to_string(),
            api_url: DEFAULT_GRAPH_API.to_string(),
            scope: DEFAULT_GRAPH_SCOPE.to_string(),
        }
    }

    /// Point both endpoints at another host
    pub fn with_endpoints(mut self, authority_url: &str, api_url: &str) -> Self {
        self.authority_url = authority_url.trim_end_matches('/').to_string();
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }
}

impl fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authority_url", &self.authority_url)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Basic-auth SMTP server settings
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Implicit TLS; STARTTLS otherwise
    pub secure: bool,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The transport chosen for a request
#[derive(Debug, Clone)]
pub enum TransportConfig {
    Graph(GraphConfig),
    Smtp(SmtpConfig),
}

impl TransportConfig {
    pub fn name(&self) -> &'static str {
        match self {
            TransportConfig::Graph(_) => "graph",
            TransportConfig::Smtp(_) => "smtp",
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl MailSettings {
    /// Sender: first of `APP_MAILBOX`, `SMTP_FROM`, `SMTP_USER`
    pub fn sender(&self) -> Option<&str> {
        present(&self.app_mailbox)
            .or_else(|| present(&self.smtp_from))
            .or_else(|| present(&self.smtp_user))
    }

    /// Recipient: first of `FORWARD_TO`, `MAIL_TO`
    pub fn recipient(&self) -> Option<&str> {
        present(&self.forward_to).or_else(|| present(&self.mail_to))
    }

    /// Pick the transport for this configuration.
    ///
    /// Graph wins over SMTP. `Ok(None)` means no transport is configured.
    pub fn select_transport(&self) -> Result<Option<TransportConfig>, MailError> {
        let graph = [
            ("GRAPH_TENANT_ID", present(&self.graph_tenant_id)),
            ("GRAPH_CLIENT_ID", present(&self.graph_client_id)),
            ("GRAPH_CLIENT_SECRET", present(&self.graph_client_secret)),
        ];
        let missing: Vec<&str> = graph
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect();

        if let [(_, Some(tenant)), (_, Some(client)), (_, Some(secret))] = graph {
            let config = GraphConfig::new(tenant, client, secret).with_endpoints(
                present(&self.graph_authority_url).unwrap_or(DEFAULT_GRAPH_AUTHORITY),
                present(&self.graph_api_url).unwrap_or(DEFAULT_GRAPH_API),
            );
            return Ok(Some(TransportConfig::Graph(config)));
        }
        if missing.len() < graph.len() {
            return Err(MailError::Config(format!(
                "Microsoft Graph settings are incomplete: set {} (or remove the Graph settings to use SMTP).",
                missing.join(", ")
            )));
        }

        match (present(&self.smtp_user), present(&self.smtp_pass)) {
            (Some(username), Some(password)) => {
                let port = self.smtp_port.unwrap_or(DEFAULT_SMTP_PORT);
                Ok(Some(TransportConfig::Smtp(SmtpConfig {
                    host: present(&self.smtp_host)
                        .unwrap_or(DEFAULT_SMTP_HOST)
                        .to_string(),
                    port,
                    secure: self.smtp_secure || port == 465,
                    username: username.to_string(),
                    password: password.to_string(),
                })))
            }
            _ => Ok(None),
        }
    }
}

impl fmt::Debug for MailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| present(value).map(|_| "<redacted>");
        f.debug_struct("MailSettings")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_secure", &self.smtp_secure)
            .field("smtp_user", &self.smtp_user)
            .field("smtp_pass", &redact(&self.smtp_pass))
            .field("smtp_from", &self.smtp_from)
            .field("mail_to", &self.mail_to)
            .field("forward_to", &self.forward_to)
            .field("app_mailbox", &self.app_mailbox)
            .field("graph_tenant_id", &self.graph_tenant_id)
            .field("graph_client_id", &self.graph_client_id)
            .field("graph_client_secret", &redact(&self.graph_client_secret))
            .field("graph_authority_url", &self.graph_authority_url)
            .field("graph_api_url", &self.graph_api_url)
            .finish()
    }
}
