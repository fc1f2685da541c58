//! Response negotiation: JSON for callers that ask for it, plain text otherwise

use std::convert::Infallible;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{Map, Value};

/// Shape of the response body, chosen from the `Accept` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    PlainText,
}

impl ResponseFormat {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let accepts_json = headers
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(|item| item.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
            .any(|media| media == "application/json" || media.ends_with("+json"));

        if accepts_json {
            ResponseFormat::Json
        } else {
            ResponseFormat::PlainText
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ResponseFormat {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ResponseFormat::from_headers(&parts.headers))
    }
}

/// An outcome ready to be written in the caller's preferred format.
///
/// As JSON: `{ "ok": .., "message": .., ...extra }`. As text: the message alone.
#[derive(Debug)]
pub struct Reply {
    pub format: ResponseFormat,
    pub status: StatusCode,
    pub ok: bool,
    pub message: String,
    pub extra: Map<String, Value>,
}

impl Reply {
    pub fn success(format: ResponseFormat, message: impl Into<String>) -> Self {
        Self {
            format,
            status: StatusCode::OK,
            ok: true,
            message: message.into(),
            extra: Map::new(),
        }
    }

    pub fn failure(format: ResponseFormat, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            format,
            status,
            ok: false,
            message: message.into(),
            extra: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self.format {
            ResponseFormat::Json => {
                let mut body = Map::new();
                body.insert("ok".to_string(), Value::Bool(self.ok));
                body.insert("message".to_string(), Value::String(self.message));
                body.extend(self.extra);
                (self.status, Json(Value::Object(body))).into_response()
            }
            ResponseFormat::PlainText => (self.status, self.message).into_response(),
        }
    }
}
