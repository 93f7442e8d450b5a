//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use swasticare::provider::{GenerateRequest, GenerateResponse};
use swasticare::{
    AnalysisConfig, AnalysisError, AnalysisProgressCallback, FileHandle, InferenceProvider,
    PipelineStage,
};

/// Smallest valid PNG (1×1, transparent).
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

/// What the mock saw when asked to upload.
#[derive(Debug, Clone)]
pub struct UploadCall {
    pub path: PathBuf,
    pub existed: bool,
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub display_name: String,
}

/// How the mock answers `generate`.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    /// A response with no text parts.
    Empty,
    /// Non-2xx from the remote.
    Status(u16, String),
}

/// In-memory provider that records every call.
pub struct MockProvider {
    reply: Reply,
    fail_upload: bool,
    generate_delay: Option<Duration>,
    pub uploads: Mutex<Vec<UploadCall>>,
    pub requests: Mutex<Vec<GenerateRequest>>,
}

impl MockProvider {
    pub fn replying(text: &str) -> Self {
        Self::with_reply(Reply::Text(text.to_string()))
    }

    pub fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            fail_upload: false,
            generate_delay: None,
            uploads: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_upload(mut self) -> Self {
        self.fail_upload = true;
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.generate_delay = Some(delay);
        self
    }

    pub fn uploads(&self) -> Vec<UploadCall> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn upload_file(
        &self,
        path: &Path,
        mime_type: &str,
        display_name: &str,
    ) -> Result<FileHandle, AnalysisError> {
        let bytes = std::fs::read(path).unwrap_or_default();
        let n = {
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push(UploadCall {
                path: path.to_path_buf(),
                existed: path.exists(),
                bytes,
                mime_type: mime_type.to_string(),
                display_name: display_name.to_string(),
            });
            uploads.len()
        };

        if self.fail_upload {
            return Err(AnalysisError::UploadFailed {
                path: path.to_path_buf(),
                reason: "mock refused".to_string(),
            });
        }

        Ok(FileHandle {
            name: format!("files/mock-{n}"),
            display_name: display_name.to_string(),
            uri: format!("https://files.example/mock-{n}"),
            mime_type: mime_type.to_string(),
        })
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, AnalysisError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.generate_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            Reply::Text(text) => Ok(GenerateResponse {
                text: Some(text.clone()),
                finish_reason: Some("STOP".to_string()),
                prompt_tokens: 258,
                output_tokens: 12,
            }),
            Reply::Empty => Ok(GenerateResponse {
                text: None,
                finish_reason: Some("SAFETY".to_string()),
                ..Default::default()
            }),
            Reply::Status(status, message) => Err(AnalysisError::ApiError {
                status: *status,
                message: message.clone(),
            }),
        }
    }
}

/// Records stages; optionally deletes the staged file as soon as it exists.
#[derive(Default)]
pub struct StageRecorder {
    pub delete_on_staged: bool,
    pub stages: Mutex<Vec<PipelineStage>>,
    pub staged_paths: Mutex<Vec<PathBuf>>,
}

impl StageRecorder {
    pub fn deleting() -> Self {
        Self {
            delete_on_staged: true,
            ..Default::default()
        }
    }

    pub fn stages(&self) -> Vec<PipelineStage> {
        self.stages.lock().unwrap().clone()
    }
}

impl AnalysisProgressCallback for StageRecorder {
    fn on_stage(&self, stage: PipelineStage) {
        self.stages.lock().unwrap().push(stage);
    }

    fn on_staged(&self, path: &Path, _bytes: usize) {
        self.staged_paths.lock().unwrap().push(path.to_path_buf());
        if self.delete_on_staged {
            std::fs::remove_file(path).unwrap();
        }
    }
}

/// Config wired to `provider`, staging into `staging_dir`.
pub fn config_with(provider: Arc<MockProvider>, staging_dir: &Path) -> AnalysisConfig {
    AnalysisConfig::builder()
        .provider(provider)
        .staging_dir(staging_dir)
        .build()
        .unwrap()
}

/// Number of entries in `dir`.
pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
