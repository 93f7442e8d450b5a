//! `GeminiProvider` against a local stand-in for the Gemini REST API.
//!
//! The stand-in implements the resumable File API upload and
//! `generateContent`, records what it receives, and can be told to fail.

#![cfg(feature = "web")]

mod common;

use axum::body::Bytes;
use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use common::{entries, TINY_PNG};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use swasticare::provider::{Content, GenerateRequest};
use swasticare::{
    analyze, AnalysisConfig, AnalysisError, GeminiProvider, GenerationConfig, InferenceProvider,
    UploadedImage,
};
use tempfile::TempDir;

const KEY: &str = "test-key";

#[derive(Default, Clone, Copy)]
enum Fault {
    #[default]
    None,
    UploadStartUnauthorized,
    MissingUploadUrl,
    GenerateRateLimited,
    GenerateServerError,
}

#[derive(Default)]
struct Seen {
    start_body: Option<Value>,
    start_headers: Option<HeaderMap>,
    uploaded: Option<(HeaderMap, Vec<u8>)>,
    generate_model: Option<String>,
    generate_body: Option<Value>,
}

struct FakeGemini {
    base: String,
    fault: Fault,
    seen: Mutex<Seen>,
}

async fn spawn(fault: Fault) -> Arc<FakeGemini> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let fake = Arc::new(FakeGemini {
        base,
        fault,
        seen: Mutex::new(Seen::default()),
    });

    let app = Router::new()
        .route("/upload/v1beta/files", post(upload_start))
        .route("/upload-session/{id}", post(upload_finish))
        .route("/v1beta/models/{model}", post(generate))
        .with_state(Arc::clone(&fake));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    fake
}

fn has_key(headers: &HeaderMap) -> bool {
    headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) == Some(KEY)
}

async fn upload_start(
    State(fake): State<Arc<FakeGemini>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !has_key(&headers) || matches!(fake.fault, Fault::UploadStartUnauthorized) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"code": 401, "message": "API key not valid"}})),
        )
            .into_response();
    }
    {
        let mut seen = fake.seen.lock().unwrap();
        seen.start_body = Some(body);
        seen.start_headers = Some(headers);
    }
    let mut response = StatusCode::OK.into_response();
    if !matches!(fake.fault, Fault::MissingUploadUrl) {
        let url = format!("{}/upload-session/abc123", fake.base);
        response
            .headers_mut()
            .insert("x-goog-upload-url", HeaderValue::from_str(&url).unwrap());
    }
    response
}

async fn upload_finish(
    State(fake): State<Arc<FakeGemini>>,
    UrlPath(id): UrlPath<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    assert_eq!(id, "abc123");
    let mime = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let display = fake
        .seen
        .lock()
        .unwrap()
        .start_body
        .as_ref()
        .and_then(|b| b["file"]["displayName"].as_str().map(str::to_string))
        .unwrap_or_default();
    fake.seen.lock().unwrap().uploaded = Some((headers, body.to_vec()));

    Json(json!({
        "file": {
            "name": "files/abc123",
            "displayName": display,
            "mimeType": mime,
            "sizeBytes": body.len().to_string(),
            "uri": format!("{}/v1beta/files/abc123", fake.base),
            "state": "ACTIVE"
        }
    }))
    .into_response()
}

async fn generate(
    State(fake): State<Arc<FakeGemini>>,
    UrlPath(model): UrlPath<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !has_key(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    {
        let mut seen = fake.seen.lock().unwrap();
        seen.generate_model = Some(model);
        seen.generate_body = Some(body);
    }
    match fake.fault {
        Fault::GenerateRateLimited => (
            StatusCode::TOO_MANY_REQUESTS,
            [("retry-after", "7")],
            "slow down",
        )
            .into_response(),
        Fault::GenerateServerError => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": {"code": 500, "message": "Internal error encountered."}})),
        )
            .into_response(),
        _ => Json(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"text": "The image shows "}, {"text": "a healthy chest."}]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 270, "candidatesTokenCount": 9, "totalTokenCount": 279}
        }))
        .into_response(),
    }
}

fn config_for(fake: &FakeGemini, staging: &std::path::Path) -> AnalysisConfig {
    AnalysisConfig::builder()
        .api_key(KEY)
        .api_base_url(fake.base.clone())
        .staging_dir(staging)
        .build()
        .unwrap()
}

#[tokio::test]
async fn full_run_over_http() {
    let fake = spawn(Fault::None).await;
    let dir = TempDir::new().unwrap();
    let config = config_for(&fake, dir.path());

    let outcome = analyze(Some(UploadedImage::new("x.jpg", TINY_PNG.to_vec())), &config)
        .await
        .unwrap();

    let uri = format!("{}/v1beta/files/abc123", fake.base);
    assert_eq!(outcome.report_text(), Some("The image shows a healthy chest."));
    assert_eq!(
        outcome.notices[0].message,
        format!("✅ Uploaded file 'x.jpg' as: {uri}")
    );
    assert_eq!(outcome.stats.prompt_tokens, 270);
    assert_eq!(outcome.stats.output_tokens, 9);
    assert_eq!(entries(dir.path()), 0);

    let seen = fake.seen.lock().unwrap();

    let start_headers = seen.start_headers.as_ref().unwrap();
    assert_eq!(start_headers["x-goog-upload-protocol"], "resumable");
    assert_eq!(start_headers["x-goog-upload-command"], "start");
    assert_eq!(start_headers["x-goog-upload-header-content-type"], "image/png");
    assert_eq!(
        start_headers["x-goog-upload-header-content-length"],
        TINY_PNG.len().to_string().as_str()
    );
    assert_eq!(
        seen.start_body.as_ref().unwrap(),
        &json!({"file": {"displayName": "x.jpg"}})
    );

    let (upload_headers, bytes) = seen.uploaded.as_ref().unwrap();
    assert_eq!(upload_headers["x-goog-upload-command"], "upload, finalize");
    assert_eq!(upload_headers["x-goog-upload-offset"], "0");
    assert_eq!(bytes.as_slice(), TINY_PNG);

    assert_eq!(
        seen.generate_model.as_deref(),
        Some("gemini-1.5-pro:generateContent")
    );
    let body = seen.generate_body.as_ref().unwrap();
    assert_eq!(
        body["contents"],
        json!([
            {"role": "user", "parts": [{"fileData": {"mimeType": "image/png", "fileUri": uri}}]},
            {"role": "user", "parts": [{"text": "Analyze this medical image and provide a detailed report."}]}
        ])
    );
    let generation = &body["generationConfig"];
    assert_eq!(generation["topK"], 64);
    assert_eq!(generation["maxOutputTokens"], 8192);
    assert_eq!(generation["responseMimeType"], "text/plain");
    assert!((generation["temperature"].as_f64().unwrap() - 0.5).abs() < 1e-6);
}

#[tokio::test]
async fn bad_key_is_auth_error() {
    let fake = spawn(Fault::UploadStartUnauthorized).await;
    let provider = GeminiProvider::new(KEY, fake.base.clone()).unwrap();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.png");
    std::fs::write(&path, TINY_PNG).unwrap();

    let err = provider
        .upload_file(&path, "image/png", "a.png")
        .await
        .unwrap_err();

    match err {
        AnalysisError::AuthError { provider, detail } => {
            assert_eq!(provider, "gemini");
            assert_eq!(detail, "API key not valid");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn missing_session_url_is_upload_failure() {
    let fake = spawn(Fault::MissingUploadUrl).await;
    let provider = GeminiProvider::new(KEY, fake.base.clone()).unwrap();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.png");
    std::fs::write(&path, TINY_PNG).unwrap();

    let err = provider
        .upload_file(&path, "image/png", "a.png")
        .await
        .unwrap_err();

    match err {
        AnalysisError::UploadFailed { reason, .. } => {
            assert!(reason.contains("x-goog-upload-url"), "got {reason}")
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

fn one_turn_request() -> GenerateRequest {
    GenerateRequest {
        model: "models/gemini-1.5-pro".to_string(),
        contents: vec![Content::user_text("hello")],
        generation: GenerationConfig::default(),
    }
}

#[tokio::test]
async fn rate_limit_keeps_retry_after() {
    let fake = spawn(Fault::GenerateRateLimited).await;
    let provider = GeminiProvider::new(KEY, fake.base.clone()).unwrap();

    let err = provider.generate(&one_turn_request()).await.unwrap_err();

    match err {
        AnalysisError::RateLimitExceeded {
            retry_after_secs, ..
        } => assert_eq!(retry_after_secs, Some(7)),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        fake.seen.lock().unwrap().generate_model.as_deref(),
        Some("gemini-1.5-pro:generateContent")
    );
}

#[tokio::test]
async fn server_error_message_is_extracted() {
    let fake = spawn(Fault::GenerateServerError).await;
    let dir = TempDir::new().unwrap();
    let config = config_for(&fake, dir.path());

    let failure = analyze(Some(UploadedImage::new("a.png", TINY_PNG.to_vec())), &config)
        .await
        .unwrap_err();

    match failure.error {
        AnalysisError::ApiError { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Internal error encountered.");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        failure.notices[0].message,
        format!("✅ Uploaded file 'a.png' as: {}/v1beta/files/abc123", fake.base)
    );
    assert_eq!(entries(dir.path()), 0);
}
