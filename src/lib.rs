//! # swasticare
//!
//! Upload a medical image, let a remote vision model (Gemini) look at it,
//! and show the model's written analysis.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image bytes
//!  │
//!  ├─ 1. Stage    write to temp_<random>.<ext> in the staging directory
//!  ├─ 2. Ingest   upload through the provider's File API → handle (uri)
//!  ├─ 3. Session  chat seeded with the file, one fixed prompt
//!  ├─ 4. Render   "📋 Analysis Result:" + the model's text
//!  └─ 5. Cleanup  staged file removed on every exit path
//! ```
//!
//! The model does all the work. This crate stages the file, talks to the
//! provider, and renders the answer, either as a single web page
//! (`swasticare serve`) or on the command line (`swasticare analyze`).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use swasticare::{analyze_file, AnalysisConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AnalysisConfig::builder()
//!         .api_key(std::env::var("GEMINI_API_KEY")?)
//!         .build()?;
//!     let outcome = analyze_file("chest-xray.png", &config).await?;
//!     for notice in &outcome.notices {
//!         eprintln!("{}", notice.to_line());
//!     }
//!     if let Some(report) = outcome.report {
//!         println!("{}", report.to_markdown());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `web`   | on      | axum router serving the upload page |
//! | `cli`   | on      | The `swasticare` binary (clap + anyhow + tracing-subscriber); implies `web` |
//!
//! The output is not a diagnosis.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod provider;
#[cfg(feature = "web")]
pub mod web;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze, analyze_file, analyze_file_to, analyze_sync, resolve_provider};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, GenerationConfig, MimePolicy};
pub use error::{AnalysisError, AnalysisFailure};
pub use output::{
    AnalysisOutcome, AnalysisReport, AnalysisStats, FileHandle, ImageKind, Notice, NoticeLevel,
    UploadedImage,
};
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, PipelineStage, ProgressCallback};
pub use provider::{GeminiProvider, InferenceProvider};
