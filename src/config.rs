//! Configuration types for medical image analysis.
//!
//! All behaviour is controlled through [`AnalysisConfig`], built via its
//! [`AnalysisConfigBuilder`]. The config is assembled once at start-up and
//! handed to every run by reference; nothing in the crate mutates it
//! afterwards.

use crate::error::AnalysisError;
use crate::output::UploadedImage;
use crate::progress::ProgressCallback;
use crate::prompts::ANALYSIS_PROMPT;
use crate::provider::InferenceProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";

/// Gemini REST endpoint root.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Configuration for an analysis run.
///
/// # Example
/// ```rust
/// use swasticare::{AnalysisConfig, MimePolicy};
///
/// let config = AnalysisConfig::builder()
///     .api_key("test-key")
///     .temperature(0.2)
///     .mime_policy(MimePolicy::FromExtension)
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "gemini-1.5-pro");
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Model identifier. Default: `gemini-1.5-pro`.
    pub model: String,

    /// Sampling and decoding parameters sent with every request.
    pub generation: GenerationConfig,

    /// Static API credential. Ignored when `provider` is set.
    pub api_key: Option<String>,

    /// Pre-constructed provider. Takes precedence over `api_key`.
    pub provider: Option<Arc<dyn InferenceProvider>>,

    /// Root URL of the Gemini API. Default: [`DEFAULT_API_BASE_URL`].
    pub api_base_url: String,

    /// Which MIME type to declare when uploading. Default: always `image/png`.
    pub mime_policy: MimePolicy,

    /// Directory that receives staged uploads. Default: the working directory.
    pub staging_dir: PathBuf,

    /// Prompt sent after the image. Default: [`ANALYSIS_PROMPT`].
    pub prompt: String,

    /// Upper bound for each remote call, in seconds. Default: None (wait forever).
    ///
    /// The remote calls cannot be cancelled by the user; with no bound an
    /// unresponsive service stalls the run indefinitely.
    pub api_timeout_secs: Option<u64>,

    /// Optional observer for pipeline state changes.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            generation: GenerationConfig::default(),
            api_key: None,
            provider: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            mime_policy: MimePolicy::default(),
            staging_dir: PathBuf::from("."),
            prompt: ANALYSIS_PROMPT.to_string(),
            api_timeout_secs: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("model", &self.model)
            .field("generation", &self.generation)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("api_base_url", &self.api_base_url)
            .field("mime_policy", &self.mime_policy)
            .field("staging_dir", &self.staging_dir)
            .field("prompt", &self.prompt)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn generation(mut self, generation: GenerationConfig) -> Self {
        self.config.generation = generation;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.generation.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn top_p(mut self, p: f32) -> Self {
        self.config.generation.top_p = p.clamp(0.0, 1.0);
        self
    }

    pub fn top_k(mut self, k: u32) -> Self {
        self.config.generation.top_k = k.max(1);
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.generation.max_output_tokens = n;
        self
    }

    pub fn response_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.config.generation.response_mime_type = mime.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn InferenceProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn mime_policy(mut self, policy: MimePolicy) -> Self {
        self.config.mime_policy = policy;
        self
    }

    pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.staging_dir = dir.into();
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = prompt.into();
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, AnalysisError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(AnalysisError::InvalidConfig("Model name must not be empty".into()));
        }
        let g = &c.generation;
        if !(0.0..=2.0).contains(&g.temperature) {
            return Err(AnalysisError::InvalidConfig(format!(
                "temperature must be in 0..=2, got {}",
                g.temperature
            )));
        }
        if !(0.0..=1.0).contains(&g.top_p) {
            return Err(AnalysisError::InvalidConfig(format!(
                "top_p must be in 0..=1, got {}",
                g.top_p
            )));
        }
        if g.top_k == 0 {
            return Err(AnalysisError::InvalidConfig("top_k must be ≥ 1".into()));
        }
        if c.generation.max_output_tokens == 0 {
            return Err(AnalysisError::InvalidConfig(
                "max_output_tokens must be ≥ 1".into(),
            ));
        }
        if c.prompt.trim().is_empty() {
            return Err(AnalysisError::InvalidConfig("Prompt must not be empty".into()));
        }
        if c.api_timeout_secs == Some(0) {
            return Err(AnalysisError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if !c.api_base_url.starts_with("http://") && !c.api_base_url.starts_with("https://") {
            return Err(AnalysisError::InvalidConfig(format!(
                "API base URL must be http(s), got '{}'",
                c.api_base_url
            )));
        }
        Ok(self.config)
    }
}

/// Sampling parameters, serialised in the provider's camelCase wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling randomness. Default: 0.5.
    pub temperature: f32,
    /// Nucleus-sampling mass. Default: 0.95.
    pub top_p: f32,
    /// Candidate pool size. Default: 64.
    pub top_k: u32,
    /// Default: 8192.
    pub max_output_tokens: u32,
    /// Default: `text/plain`.
    pub response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
            response_mime_type: "text/plain".to_string(),
        }
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the MIME type for the remote upload is chosen.
///
/// The default declares every upload as `image/png`, JPEGs included. The
/// remote service sniffs the content, so this has not caused visible
/// failures, but it is not what the bytes are. `FromExtension` and
/// `Declared` send the real type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MimePolicy {
    /// Always send this MIME type. (default: `image/png`)
    Fixed(String),
    /// Derive from the filename extension.
    FromExtension,
    /// Trust the client's declared type; fall back to the extension.
    Declared,
}

impl Default for MimePolicy {
    fn default() -> Self {
        MimePolicy::Fixed("image/png".to_string())
    }
}

impl MimePolicy {
    /// Pick the MIME type to send for `upload`.
    pub fn resolve(&self, upload: &UploadedImage) -> String {
        let from_ext = || {
            upload
                .kind()
                .map(|k| k.mime_type().to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string())
        };
        match self {
            MimePolicy::Fixed(mime) => mime.clone(),
            MimePolicy::FromExtension => from_ext(),
            MimePolicy::Declared => upload
                .content_type
                .as_deref()
                .filter(|ct| ct.starts_with("image/"))
                .map(str::to_string)
                .unwrap_or_else(from_ext),
        }
    }
}
