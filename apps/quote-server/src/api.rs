//! HTTP surface: routes, handlers and multipart extraction

use std::path::Path;

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    handler::HandlerWithoutStateExt,
    http::StatusCode,
    response::Redirect,
    routing::{get, get_service},
    Json, Router,
};
use quote_core::{FormFields, Submission, UploadedFile, MAX_ATTACHMENT_BYTES};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{debug, error, warn};

use crate::error::SubmissionError;
use crate::negotiate::{Reply, ResponseFormat};
use crate::pipeline;
use crate::AppState;

/// Multipart field name carrying uploaded drawings
pub const DRAWINGS_FIELD: &str = "drawings";

pub const NOT_FOUND_MESSAGE: &str = "Not Found. Please open / and submit the form.";

/// Whole-request cap; individual files are held to [`MAX_ATTACHMENT_BYTES`]
const REQUEST_BODY_LIMIT: usize = 64 * 1024 * 1024;

const OCTET_STREAM: &str = "application/octet-stream";

/// Build the application router
pub fn router(state: AppState, static_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let assets = ServeDir::new(static_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(handle_not_found.into_service());

    Router::new()
        .route(
            "/",
            get_service(ServeFile::new(static_dir.join("index.html"))),
        )
        .route("/health", get(handle_health))
        .route(
            "/quote",
            get(handle_quote_redirect).post(handle_submit_quote),
        )
        .route(
            "/thank-you",
            get_service(ServeFile::new(static_dir.join("thank-you.html"))),
        )
        .fallback_service(assets)
        .layer(DefaultBodyLimit::max(REQUEST_BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
pub async fn handle_health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// The form lives at `/`
pub async fn handle_quote_redirect() -> Redirect {
    Redirect::to("/")
}

pub async fn handle_not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE)
}

/// Accept a quote request
///
/// Multipart fields are the form values; files arrive under `drawings`. Any
/// other body is taken as an empty request.
pub async fn handle_submit_quote(
    State(state): State<AppState>,
    format: ResponseFormat,
    multipart: Result<Multipart, MultipartRejection>,
) -> Reply {
    let submission = match multipart {
        Ok(multipart) => read_submission(multipart).await,
        Err(rejection) => {
            // Not multipart/form-data: no fields and no files
            warn!(reason = %rejection.body_text(), "Quote posted without multipart form data");
            Ok(Submission::default())
        }
    };
    let outcome = match submission {
        Ok(submission) => pipeline::process(&state, submission).await,
        Err(err) => Err(err),
    };

    match outcome {
        Ok(receipt) => receipt.into_reply(format),
        Err(err) => {
            error!(error = %err, "Quote submission failed");
            err.into_reply(format)
        }
    }
}

/// Collect form values and uploads.
///
/// Repeated text fields (checkbox groups) are joined with `", "`. Each upload
/// is capped at [`MAX_ATTACHMENT_BYTES`] while it streams in.
pub async fn read_submission(mut multipart: Multipart) -> Result<Submission, SubmissionError> {
    let mut fields = FormFields::new();
    let mut attachments = Vec::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| SubmissionError::Multipart(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(file_name) = field.file_name().map(str::to_string) {
            if name != DRAWINGS_FIELD {
                warn!(field = %name, file = %file_name, "Ignoring upload outside the drawings field");
                continue;
            }
            let content_type = field.content_type().unwrap_or(OCTET_STREAM).to_string();

            let mut data = Vec::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|e| SubmissionError::Multipart(e.body_text()))?
            {
                if data.len() + chunk.len() > MAX_ATTACHMENT_BYTES {
                    return Err(SubmissionError::Attachment(format!(
                        "{} is larger than the {} MB upload limit.",
                        file_name,
                        MAX_ATTACHMENT_BYTES / (1024 * 1024)
                    )));
                }
                data.extend_from_slice(&chunk);
            }

            // An empty file input still posts a nameless, empty part
            if file_name.is_empty() && data.is_empty() {
                continue;
            }
            debug!(file = %file_name, bytes = data.len(), "Received upload");
            attachments.push(UploadedFile::new(file_name, content_type, data));
            continue;
        }

        if name.is_empty() {
            continue;
        }
        let value = field
            .text()
            .await
            .map_err(|e| SubmissionError::Multipart(e.body_text()))?;
        match fields.get_mut(&name) {
            Some(existing) => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            None => {
                fields.insert(name, value);
            }
        }
    }

    Ok(Submission::new(fields, attachments))
}
