//! Web front end: one page, one form, one run at a time.
//!
//! ## Routes
//!
//! | Method | Path           | Response |
//! |--------|----------------|----------|
//! | GET    | `/`            | the upload page |
//! | POST   | `/analyze`     | the page with notices and the report |
//! | POST   | `/api/analyze` | `AnalysisOutcome` as JSON |
//! | GET    | `/health`      | `{"status":"running"}` |
//!
//! Both POST routes take `multipart/form-data` with the image in the
//! `image` field. Runs are serialised through [`AppState`]'s gate, so a
//! second submission waits until the first has finished and cleaned up.

pub mod page;

use crate::analyze::{analyze, resolve_provider};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisFailure};
use crate::output::{AnalysisOutcome, UploadedImage};
use axum::extract::multipart::Multipart;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Largest accepted request body. A local limit on form posts; the image
/// itself reaches the provider through the File API.
pub const DEFAULT_BODY_LIMIT: usize = 20 * 1024 * 1024;

/// Multipart field carrying the image.
pub const IMAGE_FIELD: &str = "image";

/// Shared state: the fixed configuration and the one-run-at-a-time gate.
pub struct AppState {
    config: AnalysisConfig,
    gate: Mutex<()>,
}

impl AppState {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            gate: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    async fn run(&self, upload: Option<UploadedImage>) -> Result<AnalysisOutcome, AnalysisFailure> {
        let _turn = self.gate.lock().await;
        analyze(upload, &self.config).await
    }
}

/// Build the router with the default body limit.
pub fn router(config: AnalysisConfig) -> Router {
    router_with_limit(config, DEFAULT_BODY_LIMIT)
}

pub fn router_with_limit(config: AnalysisConfig, body_limit: usize) -> Router {
    let state = Arc::new(AppState::new(config));

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/analyze", post(analyze_page_handler))
        .route("/api/analyze", post(analyze_api_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolve the provider once, bind `addr`, and serve until the process exits.
pub async fn serve(addr: SocketAddr, mut config: AnalysisConfig) -> Result<(), AnalysisError> {
    config.provider = Some(resolve_provider(&config)?);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AnalysisError::Internal(format!("Failed to bind {addr}: {e}")))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router(config))
        .await
        .map_err(|e| AnalysisError::Internal(format!("Server error: {e}")))
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn index_handler() -> Html<String> {
    Html(page::render_page(&[], None))
}

async fn health_handler() -> Json<Value> {
    Json(json!({"status": "running"}))
}

async fn analyze_page_handler(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let upload = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Html(page::render_error_page(&message))).into_response()
        }
    };

    match state.run(upload).await {
        Ok(outcome) => Html(page::render_page(&outcome.notices, outcome.report.as_ref())).into_response(),
        Err(failure) => {
            warn!("Analysis failed: {}", failure);
            let html = page::render_failure_page(&failure.notices, &failure.to_string());
            (status_for(&failure.error), Html(html)).into_response()
        }
    }
}

async fn analyze_api_handler(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let upload = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Json(json!({"error": message}))).into_response()
        }
    };

    match state.run(upload).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(failure) => {
            warn!("Analysis failed: {}", failure);
            let body = json!({"error": failure.to_string(), "notices": failure.notices});
            (status_for(&failure.error), Json(body)).into_response()
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// Pull the image out of the form.
///
/// Browsers send an empty, nameless part when no file was chosen; that
/// counts as no upload.
async fn read_upload(mut multipart: Multipart) -> Result<Option<UploadedImage>, String> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Malformed form data: {e}"))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| format!("Failed to read upload: {e}"))?;

        if filename.is_empty() {
            return Ok(None);
        }

        let mut upload = UploadedImage::new(filename, bytes.to_vec());
        if let Some(ct) = content_type {
            upload = upload.with_content_type(ct);
        }
        return Ok(Some(upload));
    }
    Ok(None)
}

/// HTTP status for a failed run.
pub fn status_for(e: &AnalysisError) -> StatusCode {
    match e {
        _ if e.is_input_error() => StatusCode::BAD_REQUEST,
        AnalysisError::ApiTimeout { .. }
        | AnalysisError::UploadFailed { .. }
        | AnalysisError::RequestFailed { .. }
        | AnalysisError::AuthError { .. }
        | AnalysisError::RateLimitExceeded { .. }
        | AnalysisError::ApiError { .. }
        | AnalysisError::EmptyResponse { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
