//! Chat session seeded with the uploaded file.
//!
//! A session is created per run and dropped with it. Its history starts
//! with a single user turn that carries the file reference; every
//! [`ChatSession::send_message`] appends the prompt and, on success, the
//! model's reply. The whole history is resent with each request because the
//! remote API is stateless.

use crate::config::{AnalysisConfig, GenerationConfig};
use crate::error::AnalysisError;
use crate::output::FileHandle;
use crate::provider::{Content, GenerateRequest, InferenceProvider};
use std::sync::Arc;
use tracing::debug;

/// The parts of a model answer the pipeline consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResponse {
    pub text: String,
    pub finish_reason: Option<String>,
    pub prompt_tokens: u32,
    pub output_tokens: u32,
}

pub struct ChatSession {
    provider: Arc<dyn InferenceProvider>,
    model: String,
    generation: GenerationConfig,
    history: Vec<Content>,
}

impl ChatSession {
    /// Start a session with an arbitrary initial history.
    pub fn start(
        provider: Arc<dyn InferenceProvider>,
        model: impl Into<String>,
        generation: GenerationConfig,
        history: Vec<Content>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            generation,
            history,
        }
    }

    /// Start a session whose only history turn is `handle`, attributed to the user.
    pub fn with_file(
        provider: Arc<dyn InferenceProvider>,
        config: &AnalysisConfig,
        handle: &FileHandle,
    ) -> Self {
        Self::start(
            provider,
            config.model.clone(),
            config.generation.clone(),
            vec![Content::user_file(handle)],
        )
    }

    pub fn history(&self) -> &[Content] {
        &self.history
    }

    /// Send `prompt` and wait for the complete answer.
    ///
    /// History is only extended when the model returns text, so a failed
    /// call leaves the session as it was.
    pub async fn send_message(&mut self, prompt: &str) -> Result<ChatResponse, AnalysisError> {
        let mut contents = self.history.clone();
        contents.push(Content::user_text(prompt));

        let request = GenerateRequest {
            model: self.model.clone(),
            contents,
            generation: self.generation.clone(),
        };

        let response = self.provider.generate(&request).await?;
        let text = response.text.ok_or_else(|| AnalysisError::EmptyResponse {
            finish_reason: response.finish_reason.clone(),
        })?;
        debug!(
            "{}: {} prompt tokens, {} output tokens",
            self.model, response.prompt_tokens, response.output_tokens
        );

        self.history = request.contents;
        self.history.push(Content::model_text(text.clone()));

        Ok(ChatResponse {
            text,
            finish_reason: response.finish_reason,
            prompt_tokens: response.prompt_tokens,
            output_tokens: response.output_tokens,
        })
    }
}
