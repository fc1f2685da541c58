//! Tests for the quote server
//!
//! Test categories:
//! - Property tests for subject lines and response negotiation
//! - HTTP endpoint tests driving the full router through axum-test, with a
//!   local fake of the Microsoft identity and Graph endpoints

#[cfg(test)]
mod property_tests {
    use axum::http::{header, HeaderMap, HeaderValue};
    use proptest::prelude::*;
    use quote_core::{FormFields, Submission};

    use crate::negotiate::ResponseFormat;
    use crate::pipeline::subject_line;

    fn name_part() -> impl Strategy<Value = String> {
        prop_oneof![Just(String::new()), Just("   ".to_string()), "[A-Za-z' -]{1,20}"]
    }

    proptest! {
        /// Property: the subject only ever carries provided name parts
        #[test]
        fn subject_names_only_provided_parts(first in name_part(), last in name_part()) {
            let mut fields = FormFields::new();
            fields.insert("first_name".into(), first.clone());
            fields.insert("last_name".into(), last.clone());
            let subject = subject_line(&Submission::new(fields, Vec::new()));

            let parts: Vec<&str> = [first.trim(), last.trim()]
                .into_iter()
                .filter(|p| !p.is_empty())
                .collect();
            if parts.is_empty() {
                prop_assert_eq!(subject, "New quote request");
            } else {
                prop_assert_eq!(subject, format!("New quote request: {}", parts.join(" ")));
            }
        }

        /// Property: any Accept list naming application/json negotiates JSON
        #[test]
        fn json_anywhere_in_accept_list(
            before in prop::collection::vec("(text/html|text/plain|image/png|\\*/\\*)", 0..3),
            after in prop::collection::vec("(text/html|text/plain|image/png)", 0..3),
            q in 1u8..10
        ) {
            let mut items = before.clone();
            items.push(format!("application/json;q=0.{}", q));
            items.extend(after.clone());

            let mut headers = HeaderMap::new();
            headers.insert(header::ACCEPT, HeaderValue::from_str(&items.join(", ")).unwrap());
            prop_assert_eq!(ResponseFormat::from_headers(&headers), ResponseFormat::Json);
        }
    }
}

#[cfg(test)]
mod http_endpoint_tests {
    //! HTTP endpoint integration tests using axum-test

    use std::path::{Path as FsPath, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::http::{header, HeaderValue, StatusCode};
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use mail_transport::testing::{FakeGraph, FakeSmtp};
    use mail_transport::MailSettings;
    use pretty_assertions::assert_eq;
    use quote_core::{
        DocumentRenderer, PdfRenderer, RenderError, RenderedDocument, Submission, SubmissionStore,
        MAX_ATTACHMENT_BYTES,
    };
    use serde_json::{json, Value};
    use tempfile::TempDir;

    use crate::api::{router, NOT_FOUND_MESSAGE};
    use crate::error::GENERIC_FAILURE;
    use crate::AppState;

    struct FailingRenderer;

    #[async_trait]
    impl DocumentRenderer for FailingRenderer {
        async fn render(&self, _submission: &Submission) -> Result<RenderedDocument, RenderError> {
            Err(RenderError::Pdf("font table missing".into()))
        }
    }

    /// Claims success but produces no bytes
    struct EmptyRenderer;

    #[async_trait]
    impl DocumentRenderer for EmptyRenderer {
        async fn render(&self, _submission: &Submission) -> Result<RenderedDocument, RenderError> {
            Ok(RenderedDocument::new(Vec::new()))
        }
    }

    fn static_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static")
    }

    fn test_server(mail: MailSettings, renderer: Arc<dyn DocumentRenderer>, root: &FsPath) -> TestServer {
        let state = AppState {
            mail: Arc::new(mail),
            renderer,
            store: SubmissionStore::new(root),
            mail_timeout: Duration::from_secs(5),
        };
        TestServer::new(router(state, &static_dir())).unwrap()
    }

    fn unconfigured_server(root: &FsPath) -> TestServer {
        test_server(MailSettings::default(), Arc::new(PdfRenderer::new()), root)
    }

    fn jane_doe() -> MultipartForm {
        MultipartForm::new()
            .add_text("first_name", "Jane")
            .add_text("last_name", "Doe")
            .add_text("email", "jane@x.com")
    }

    fn accept_json() -> HeaderValue {
        HeaderValue::from_static("application/json")
    }

    fn s(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    fn graph_settings(fake: &FakeGraph) -> MailSettings {
        MailSettings {
            graph_tenant_id: s("tenant"),
            graph_client_id: s("client"),
            graph_client_secret: s("secret"),
            graph_authority_url: Some(fake.base_url.clone()),
            graph_api_url: Some(fake.api_url()),
            app_mailbox: s("quotes@agribuild.test"),
            mail_to: s("sales@agribuild.test"),
            ..Default::default()
        }
    }

    fn stored_records(root: &FsPath) -> Vec<String> {
        match std::fs::read_dir(root) {
            Ok(entries) => entries
                .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_health_returns_ok() {
        let tmp = TempDir::new().unwrap();
        let server = unconfigured_server(tmp.path());

        let response = server.get("/health").await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>(), json!({ "ok": true }));
    }

    #[tokio::test]
    async fn test_get_quote_redirects_to_form() {
        let tmp = TempDir::new().unwrap();
        let server = unconfigured_server(tmp.path());

        let response = server.get("/quote").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), "/");
    }

    #[tokio::test]
    async fn test_form_and_thank_you_pages_are_served() {
        let tmp = TempDir::new().unwrap();
        let server = unconfigured_server(tmp.path());

        let form = server.get("/").await;
        form.assert_status_ok();
        assert!(form.text().contains("name=\"drawings\""));

        let thanks = server.get("/thank-you").await;
        thanks.assert_status_ok();
        assert!(thanks.text().contains("Thank you"));
    }

    #[tokio::test]
    async fn test_unknown_route_gets_guidance() {
        let tmp = TempDir::new().unwrap();
        let server = unconfigured_server(tmp.path());

        let response = server.get("/wp-admin").await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.text(), NOT_FOUND_MESSAGE);
    }

    #[tokio::test]
    async fn test_submission_without_transport_is_saved() {
        let tmp = TempDir::new().unwrap();
        let server = unconfigured_server(tmp.path());

        let response = server
            .post("/quote")
            .add_header(header::ACCEPT, accept_json())
            .multipart(jane_doe())
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["ok"], json!(true));
        assert_eq!(body["emailed"], json!(false));

        let reference = body["reference"].as_str().unwrap();
        assert!(body["message"].as_str().unwrap().contains(reference));

        let record = tmp.path().join(reference);
        assert!(record.join("quote-request.pdf").is_file());
        assert!(record.join("summary.txt").is_file());
        assert!(record.join("attachments").is_dir());

        let fields: Value =
            serde_json::from_slice(&std::fs::read(record.join("submission.json")).unwrap()).unwrap();
        assert_eq!(
            fields,
            json!({ "first_name": "Jane", "last_name": "Doe", "email": "jane@x.com" })
        );

        let pdf = std::fs::read(record.join("quote-request.pdf")).unwrap();
        assert!(pdf.starts_with(b"%PDF"));

        let summary = std::fs::read_to_string(record.join("summary.txt")).unwrap();
        assert!(summary.contains("First name: Jane"));
        assert!(summary.lines().any(|line| line == "Telephone:"));
    }

    #[tokio::test]
    async fn test_plain_text_reply_without_json_accept() {
        let tmp = TempDir::new().unwrap();
        let server = unconfigured_server(tmp.path());

        let response = server.post("/quote").multipart(jane_doe()).await;

        response.assert_status_ok();
        let text = response.text();
        assert!(text.starts_with("Thanks! Your quote request has been received. Reference: "));
        assert_eq!(stored_records(tmp.path()).len(), 1);
    }

    #[tokio::test]
    async fn test_uploads_and_repeated_fields_are_stored() {
        let tmp = TempDir::new().unwrap();
        let server = unconfigured_server(tmp.path());

        let form = jane_doe()
            .add_text("door_types", "Roller shutter")
            .add_text("door_types", "Personnel")
            .add_part(
                "drawings",
                Part::bytes(b"site plan".to_vec())
                    .file_name("Site Plan (rev B).pdf")
                    .mime_type("application/pdf"),
            )
            .add_part(
                "drawings",
                Part::bytes(b"elevation".to_vec())
                    .file_name("elevation.png")
                    .mime_type("image/png"),
            );

        let response = server
            .post("/quote")
            .add_header(header::ACCEPT, accept_json())
            .multipart(form)
            .await;
        response.assert_status_ok();

        let body = response.json::<Value>();
        let record = tmp.path().join(body["reference"].as_str().unwrap());

        let mut stored = stored_records(&record.join("attachments"));
        stored.sort();
        assert_eq!(stored, vec!["01-Site Plan _rev B_.pdf", "02-elevation.png"]);

        let fields: Value =
            serde_json::from_slice(&std::fs::read(record.join("submission.json")).unwrap()).unwrap();
        assert_eq!(fields["door_types"], json!("Roller shutter, Personnel"));
    }

    #[tokio::test]
    async fn test_graph_delivery_reports_emailed() {
        let tmp = TempDir::new().unwrap();
        let fake = FakeGraph::start(200, 202).await;
        let server = test_server(graph_settings(&fake), Arc::new(PdfRenderer::new()), tmp.path());

        let form = jane_doe().add_part(
            "drawings",
            Part::bytes(b"plan".to_vec())
                .file_name("plan.dwg")
                .mime_type("application/acad"),
        );
        let response = server
            .post("/quote")
            .add_header(header::ACCEPT, accept_json())
            .multipart(form)
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["emailed"], json!(true));
        let reference = body["reference"].as_str().unwrap().to_string();
        assert_eq!(
            body["message"],
            json!(format!("Thanks! Your quote request has been sent. Reference: {}", reference))
        );

        let sent = fake.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["mailbox"], json!("quotes@agribuild.test"));

        let message = &sent[0]["body"]["message"];
        assert_eq!(message["subject"], json!("New quote request: Jane Doe"));
        assert_eq!(
            message["toRecipients"],
            json!([{ "emailAddress": { "address": "sales@agribuild.test" } }])
        );
        assert_eq!(
            message["replyTo"],
            json!([{ "emailAddress": { "address": "jane@x.com" } }])
        );
        assert_eq!(
            message["attachments"][0]["name"],
            json!(format!("quote-request-{}.pdf", reference))
        );
        assert_eq!(message["attachments"][1]["name"], json!("plan.dwg"));
        assert!(message["body"]["content"]
            .as_str()
            .unwrap()
            .ends_with(&format!("Reference: {}", reference)));
    }

    #[tokio::test]
    async fn test_token_failure_still_saves() {
        let tmp = TempDir::new().unwrap();
        let fake = FakeGraph::start(401, 202).await;
        let server = test_server(graph_settings(&fake), Arc::new(PdfRenderer::new()), tmp.path());

        let response = server
            .post("/quote")
            .add_header(header::ACCEPT, accept_json())
            .multipart(jane_doe())
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["ok"], json!(true));
        assert_eq!(body["emailed"], json!(false));
        assert!(tmp
            .path()
            .join(body["reference"].as_str().unwrap())
            .join("quote-request.pdf")
            .is_file());
        assert!(fake.sent().is_empty());
    }

    #[tokio::test]
    async fn test_forbidden_send_still_saves() {
        let tmp = TempDir::new().unwrap();
        let fake = FakeGraph::start(200, 403).await;
        let server = test_server(graph_settings(&fake), Arc::new(PdfRenderer::new()), tmp.path());

        let response = server
            .post("/quote")
            .add_header(header::ACCEPT, accept_json())
            .multipart(jane_doe())
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["emailed"], json!(false));
        assert_eq!(fake.sent().len(), 1);
        assert_eq!(stored_records(tmp.path()).len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_recipient_skips_delivery() {
        let tmp = TempDir::new().unwrap();
        let fake = FakeGraph::start(200, 202).await;
        let settings = MailSettings {
            mail_to: s("not-an-email"),
            ..graph_settings(&fake)
        };
        let server = test_server(settings, Arc::new(PdfRenderer::new()), tmp.path());

        let response = server
            .post("/quote")
            .add_header(header::ACCEPT, accept_json())
            .multipart(jane_doe())
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["emailed"], json!(false));
        assert!(fake.sent().is_empty());
    }

    #[tokio::test]
    async fn test_render_failure_stores_nothing() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("submissions");
        let server = test_server(MailSettings::default(), Arc::new(FailingRenderer), &root);

        let response = server
            .post("/quote")
            .add_header(header::ACCEPT, accept_json())
            .multipart(jane_doe())
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.json::<Value>(),
            json!({ "ok": false, "message": GENERIC_FAILURE })
        );
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_render_failure_plain_text() {
        let tmp = TempDir::new().unwrap();
        let server = test_server(MailSettings::default(), Arc::new(FailingRenderer), tmp.path());

        let response = server.post("/quote").multipart(jane_doe()).await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.text(), GENERIC_FAILURE);
    }

    #[tokio::test]
    async fn test_partial_graph_config_fails_before_storing() {
        let tmp = TempDir::new().unwrap();
        let settings = MailSettings {
            graph_tenant_id: s("tenant"),
            smtp_user: s("quotes@agribuild.test"),
            smtp_pass: s("hunter2"),
            ..Default::default()
        };
        let server = test_server(settings, Arc::new(PdfRenderer::new()), tmp.path());

        let response = server
            .post("/quote")
            .add_header(header::ACCEPT, accept_json())
            .multipart(jane_doe())
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.json::<Value>();
        assert_eq!(body["ok"], json!(false));
        assert!(body["message"].as_str().unwrap().contains("GRAPH_CLIENT_SECRET"));
        assert!(stored_records(tmp.path()).is_empty());
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let server = unconfigured_server(tmp.path());

        let form = jane_doe().add_part(
            "drawings",
            Part::bytes(vec![0u8; MAX_ATTACHMENT_BYTES + 1])
                .file_name("huge.pdf")
                .mime_type("application/pdf"),
        );
        let response = server
            .post("/quote")
            .add_header(header::ACCEPT, accept_json())
            .multipart(form)
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.json::<Value>();
        assert_eq!(body["ok"], json!(false));
        assert!(body["message"].as_str().unwrap().contains("huge.pdf"));
        assert!(stored_records(tmp.path()).is_empty());
    }

    #[tokio::test]
    async fn test_upload_at_limit_is_accepted() {
        let tmp = TempDir::new().unwrap();
        let server = unconfigured_server(tmp.path());

        let form = jane_doe().add_part(
            "drawings",
            Part::bytes(vec![7u8; MAX_ATTACHMENT_BYTES])
                .file_name("exact.bin")
                .mime_type("application/octet-stream"),
        );
        let response = server
            .post("/quote")
            .add_header(header::ACCEPT, accept_json())
            .multipart(form)
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        let stored = tmp
            .path()
            .join(body["reference"].as_str().unwrap())
            .join("attachments")
            .join("01-exact.bin");
        assert_eq!(std::fs::metadata(stored).unwrap().len() as usize, MAX_ATTACHMENT_BYTES);
    }

    #[tokio::test]
    async fn test_non_multipart_post_is_saved_as_empty_request() {
        let tmp = TempDir::new().unwrap();
        let server = unconfigured_server(tmp.path());

        let response = server
            .post("/quote")
            .add_header(header::ACCEPT, accept_json())
            .json(&json!({ "first_name": "Jane" }))
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["ok"], json!(true));
        assert_eq!(body["emailed"], json!(false));

        let record = tmp.path().join(body["reference"].as_str().unwrap());
        let fields: Value =
            serde_json::from_slice(&std::fs::read(record.join("submission.json")).unwrap()).unwrap();
        assert_eq!(fields, json!({}));
    }

    #[tokio::test]
    async fn test_form_posted_without_multipart_encoding_is_saved() {
        let tmp = TempDir::new().unwrap();
        let server = unconfigured_server(tmp.path());

        let response = server
            .post("/quote")
            .content_type("application/x-www-form-urlencoded")
            .bytes("first_name=Jane&last_name=Doe".into())
            .await;

        response.assert_status_ok();
        assert!(response
            .text()
            .starts_with("Thanks! Your quote request has been received. Reference: "));
        assert_eq!(stored_records(tmp.path()).len(), 1);
    }

    #[tokio::test]
    async fn test_smtp_delivery_reports_emailed() {
        let tmp = TempDir::new().unwrap();
        let smtp = FakeSmtp::start().await;
        let settings = MailSettings {
            smtp_host: s("127.0.0.1"),
            smtp_port: Some(smtp.port),
            smtp_user: s("quotes@agribuild.test"),
            smtp_pass: s("hunter2"),
            mail_to: s("sales@agribuild.test"),
            ..Default::default()
        };
        let server = test_server(settings, Arc::new(PdfRenderer::new()), tmp.path());

        let response = server
            .post("/quote")
            .add_header(header::ACCEPT, accept_json())
            .multipart(jane_doe())
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["emailed"], json!(true));
        let reference = body["reference"].as_str().unwrap();

        let messages = smtp.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Subject: New quote request: Jane Doe"));
        assert!(messages[0].contains("Reply-To: jane@x.com"));
        assert!(messages[0].contains(&format!("Reference: {}", reference)));
    }

    #[tokio::test]
    async fn test_empty_render_stores_nothing() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("submissions");
        let server = test_server(MailSettings::default(), Arc::new(EmptyRenderer), &root);

        let response = server
            .post("/quote")
            .add_header(header::ACCEPT, accept_json())
            .multipart(jane_doe())
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.json::<Value>(),
            json!({ "ok": false, "message": GENERIC_FAILURE })
        );
        assert!(!root.exists());
    }
}
