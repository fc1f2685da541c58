//! In-process fakes of the mail endpoints, for tests
//!
//! Enabled by the `test-support` feature. Both fakes listen on an ephemeral
//! port on 127.0.0.1 and record what they receive.

use std::sync::{Arc, Mutex};

use axum::{
    extract::Path,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::config::GraphConfig;

/// Fake Microsoft identity token endpoint plus Graph `sendMail`
pub struct FakeGraph {
    pub base_url: String,
    sent: Arc<Mutex<Vec<Value>>>,
}

impl FakeGraph {
    /// Answer token requests with `token_status` and sends with `send_status`
    pub async fn start(token_status: u16, send_status: u16) -> Self {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let captured = sent.clone();
        let token_status = StatusCode::from_u16(token_status).expect("token status");
        let send_status = StatusCode::from_u16(send_status).expect("send status");

        let app = Router::new()
            .route(
                "/:tenant/oauth2/v2.0/token",
                post(move || async move {
                    (
                        token_status,
                        Json(json!({ "access_token": "token-abc", "token_type": "Bearer" })),
                    )
                }),
            )
            .route(
                "/v1.0/users/:mailbox/sendMail",
                post(
                    move |Path(mailbox): Path<String>, headers: HeaderMap, Json(body): Json<Value>| {
                        let captured = captured.clone();
                        async move {
                            let user_agent = headers
                                .get(header::USER_AGENT)
                                .and_then(|v| v.to_str().ok())
                                .unwrap_or_default()
                                .to_string();
                            captured.lock().expect("fake graph log").push(json!({
                                "mailbox": mailbox,
                                "user_agent": user_agent,
                                "body": body,
                            }));
                            send_status
                        }
                    },
                ),
            );

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake graph");
        let addr = listener.local_addr().expect("fake graph address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{}", addr),
            sent,
        }
    }

    pub fn api_url(&self) -> String {
        format!("{}/v1.0", self.base_url)
    }

    /// Credentials pointed at this fake
    pub fn config(&self) -> GraphConfig {
        GraphConfig::new("tenant", "client", "secret").with_endpoints(&self.base_url, &self.api_url())
    }

    /// Every accepted `sendMail` call as `{ mailbox, user_agent, body }`
    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().expect("fake graph log").clone()
    }
}

/// Plaintext ESMTP server that accepts any login and records each DATA payload.
///
/// It does not offer STARTTLS, like a local relay or a mail catcher.
pub struct FakeSmtp {
    pub port: u16,
    messages: Arc<Mutex<Vec<String>>>,
}

impl FakeSmtp {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake smtp");
        let port = listener.local_addr().expect("fake smtp address").port();
        let messages = Arc::new(Mutex::new(Vec::new()));

        let captured = messages.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let captured = captured.clone();
                tokio::spawn(async move {
                    let _ = smtp_session(stream, captured).await;
                });
            }
        });

        Self { port, messages }
    }

    /// Raw message data received so far, one entry per DATA command
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("fake smtp log").clone()
    }
}

async fn smtp_session(stream: TcpStream, captured: Arc<Mutex<Vec<String>>>) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    writer.write_all(b"220 fake.agribuild.test ESMTP\r\n").await?;

    while let Some(line) = lines.next_line().await? {
        let command = line.to_ascii_uppercase();

        if command.starts_with("EHLO") {
            writer
                .write_all(b"250-fake.agribuild.test\r\n250-AUTH PLAIN LOGIN\r\n250 8BITMIME\r\n")
                .await?;
        } else if command.starts_with("AUTH") {
            writer.write_all(b"235 2.7.0 Authentication successful\r\n").await?;
        } else if command.starts_with("DATA") {
            writer.write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n").await?;

            let mut data = String::new();
            while let Some(line) = lines.next_line().await? {
                if line == "." {
                    break;
                }
                data.push_str(&line);
                data.push_str("\r\n");
            }
            captured.lock().expect("fake smtp log").push(data);

            writer.write_all(b"250 2.0.0 Queued\r\n").await?;
        } else if command.starts_with("QUIT") {
            writer.write_all(b"221 2.0.0 Bye\r\n").await?;
            break;
        } else {
            writer.write_all(b"250 2.0.0 OK\r\n").await?;
        }
    }

    Ok(())
}
