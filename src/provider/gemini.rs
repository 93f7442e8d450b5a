//! Gemini REST client: File API upload and `generateContent`.
//!
//! ## Upload
//!
//! The File API uses Google's resumable-upload protocol even for a single
//! shot:
//!
//! ```text
//! POST {base}/upload/v1beta/files           X-Goog-Upload-Command: start
//!   ← 200, header x-goog-upload-url
//! POST <x-goog-upload-url>                  X-Goog-Upload-Command: upload, finalize
//!   ← 200, {"file": {"name", "displayName", "mimeType", "uri", …}}
//! ```
//!
//! ## Generate
//!
//! `POST {base}/v1beta/models/{model}:generateContent` with the full chat
//! history. Files are referenced by URI (`fileData`), never inlined.
//!
//! The key travels in the `x-goog-api-key` header so it never shows up in a
//! logged URL.

use super::{Content, GenerateRequest, GenerateResponse, InferenceProvider, Part, Role};
use crate::config::GenerationConfig;
use crate::error::AnalysisError;
use crate::output::FileHandle;
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

const PROVIDER_NAME: &str = "gemini";
const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// [`InferenceProvider`] backed by the Gemini REST API.
#[derive(Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiProvider {
    /// Create a client for `base_url` (normally [`crate::config::DEFAULT_API_BASE_URL`]).
    ///
    /// No timeout is set on the HTTP client; bounding calls is the
    /// pipeline's job (`AnalysisConfig::api_timeout_secs`).
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, AnalysisError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AnalysisError::ProviderNotConfigured {
                provider: PROVIDER_NAME.to_string(),
                hint: "The API key is empty.".to_string(),
            });
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!("swasticare/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AnalysisError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn upload_start_url(&self) -> String {
        format!("{}/upload/v1beta/files", self.base_url)
    }

    fn generate_url(&self, model: &str) -> String {
        let model = model.trim_start_matches("models/");
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl InferenceProvider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn upload_file(
        &self,
        path: &Path,
        mime_type: &str,
        display_name: &str,
    ) -> Result<FileHandle, AnalysisError> {
        let upload_failed = |reason: String| AnalysisError::UploadFailed {
            path: path.to_path_buf(),
            reason,
        };

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| upload_failed(format!("cannot read staged file: {e}")))?;

        // ── Step 1: open the resumable session ───────────────────────────
        let start = self
            .client
            .post(self.upload_start_url())
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&UploadStartRequest {
                file: UploadMetadata { display_name },
            })
            .send()
            .await
            .map_err(|e| request_failed("upload start", e))?;
        let start = check_status(start).await?;

        let upload_url = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| upload_failed(format!("response is missing the {UPLOAD_URL_HEADER} header")))?;
        debug!("Upload session opened for {} ({} bytes)", display_name, bytes.len());

        // ── Step 2: send the bytes and finalise ──────────────────────────
        let finish = self
            .client
            .post(&upload_url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| request_failed("upload", e))?;
        let finish = check_status(finish).await?;

        let body: UploadResponse = finish
            .json()
            .await
            .map_err(|e| upload_failed(format!("unreadable upload response: {e}")))?;

        let file = body.file;
        debug!("Uploaded {} as {}", file.name, file.uri);
        Ok(FileHandle {
            display_name: file.display_name.unwrap_or_else(|| display_name.to_string()),
            mime_type: file.mime_type.unwrap_or_else(|| mime_type.to_string()),
            name: file.name,
            uri: file.uri,
        })
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, AnalysisError> {
        let body = WireGenerateRequest::from(request);
        debug!(
            "generateContent: model={} turns={}",
            request.model,
            body.contents.len()
        );

        let response = self
            .client
            .post(self.generate_url(&request.model))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_failed("generateContent", e))?;
        let response = check_status(response).await?;

        let wire: WireGenerateResponse = response.json().await.map_err(|e| AnalysisError::ApiError {
            status: StatusCode::OK.as_u16(),
            message: format!("unreadable generateContent response: {e}"),
        })?;

        Ok(wire.into_response())
    }
}

fn request_failed(operation: &str, e: reqwest::Error) -> AnalysisError {
    AnalysisError::RequestFailed {
        operation: operation.to_string(),
        detail: e.to_string(),
    }
}

/// Pass successful responses through; map everything else to an error.
async fn check_status(response: Response) -> Result<Response, AnalysisError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, retry_after, &body))
}

fn status_error(status: StatusCode, retry_after_secs: Option<u64>, body: &str) -> AnalysisError {
    let message = serde_json::from_str::<WireErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AnalysisError::AuthError {
            provider: PROVIDER_NAME.to_string(),
            detail: message,
        },
        StatusCode::TOO_MANY_REQUESTS => AnalysisError::RateLimitExceeded {
            provider: PROVIDER_NAME.to_string(),
            retry_after_secs,
        },
        _ => AnalysisError::ApiError {
            status: status.as_u16(),
            message,
        },
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadMetadata<'a> {
    display_name: &'a str,
}

#[derive(Serialize)]
struct UploadStartRequest<'a> {
    file: UploadMetadata<'a>,
}

#[derive(Deserialize)]
struct UploadResponse {
    file: WireFile,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFile {
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    uri: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct WireFileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
enum WirePart {
    Text {
        text: String,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: WireFileData,
    },
    /// Parts we don't consume (inline data, function calls, …).
    Other(serde_json::Value),
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerateRequest<'a> {
    contents: Vec<WireContent>,
    generation_config: &'a GenerationConfig,
}

impl<'a> From<&'a GenerateRequest> for WireGenerateRequest<'a> {
    fn from(request: &'a GenerateRequest) -> Self {
        Self {
            contents: request.contents.iter().map(WireContent::from).collect(),
            generation_config: &request.generation,
        }
    }
}

impl From<&Content> for WireContent {
    fn from(content: &Content) -> Self {
        let role = match content.role {
            Role::User => "user",
            Role::Model => "model",
        };
        Self {
            role: Some(role.to_string()),
            parts: content
                .parts
                .iter()
                .map(|part| match part {
                    Part::Text(text) => WirePart::Text { text: text.clone() },
                    Part::File { mime_type, uri } => WirePart::FileData {
                        file_data: WireFileData {
                            mime_type: mime_type.clone(),
                            file_uri: uri.clone(),
                        },
                    },
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerateResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    #[serde(default)]
    usage_metadata: Option<WireUsage>,
    #[serde(default)]
    prompt_feedback: Option<WirePromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    #[serde(default)]
    content: Option<WireContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct WireErrorEnvelope {
    error: WireErrorBody,
}

#[derive(Deserialize)]
struct WireErrorBody {
    message: String,
}

impl WireGenerateResponse {
    fn into_response(self) -> GenerateResponse {
        let usage = self.usage_metadata.unwrap_or_default();
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);

        let (text, finish_reason) = match self.candidates.into_iter().next() {
            Some(candidate) => {
                let text: String = candidate
                    .content
                    .map(|c| c.parts)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|p| match p {
                        WirePart::Text { text } => Some(text),
                        _ => None,
                    })
                    .collect();
                let text = if text.is_empty() { None } else { Some(text) };
                (text, candidate.finish_reason)
            }
            None => (None, block_reason),
        };

        GenerateResponse {
            text,
            finish_reason,
            prompt_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
        }
    }
}
