//! Remote inference provider abstraction.
//!
//! The pipeline needs exactly two capabilities from a vendor:
//!
//! 1. [`InferenceProvider::upload_file`]: push a local file and get back a
//!    [`FileHandle`] the model can reference;
//! 2. [`InferenceProvider::generate`]: run the model over a conversation.
//!
//! [`GeminiProvider`] implements both against the Gemini REST API. Tests and
//! embedders can inject any other implementation through
//! [`crate::config::AnalysisConfigBuilder::provider`].

pub mod gemini;

pub use gemini::GeminiProvider;

use crate::config::GenerationConfig;
use crate::error::AnalysisError;
use crate::output::FileHandle;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One piece of a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Part {
    Text(String),
    /// Reference to a previously uploaded file.
    File { mime_type: String, uri: String },
}

/// A conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// A user turn whose only part is the uploaded file.
    pub fn user_file(handle: &FileHandle) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::File {
                mime_type: handle.mime_type.clone(),
                uri: handle.uri.clone(),
            }],
        }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text(text.into())],
        }
    }
}

/// Everything needed for one `generate` call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub contents: Vec<Content>,
    pub generation: GenerationConfig,
}

/// Result of one `generate` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateResponse {
    /// Concatenated text parts of the first candidate, if there were any.
    pub text: Option<String>,
    pub finish_reason: Option<String>,
    pub prompt_tokens: u32,
    pub output_tokens: u32,
}

/// A remote service that can ingest files and answer prompts about them.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Short identifier used in logs and error messages.
    fn name(&self) -> &str;

    /// Upload the file at `path`, declaring it as `mime_type`.
    async fn upload_file(
        &self,
        path: &Path,
        mime_type: &str,
        display_name: &str,
    ) -> Result<FileHandle, AnalysisError>;

    /// Run the model over `request.contents`.
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, AnalysisError>;
}
