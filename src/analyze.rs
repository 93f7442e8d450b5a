//! Analysis entry points.
//!
//! One call to [`analyze`] is one press of the "Generate Analysis" button:
//! stage the upload, push it to the provider, ask the fixed question, render
//! the answer, and remove the staged file. Runs share nothing but the
//! read-only [`AnalysisConfig`].

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisFailure};
use crate::output::{AnalysisOutcome, Notice, UploadedImage};
use crate::pipeline::{ingest, render, session::ChatSession, stage::StagedFile, with_timeout};
use crate::progress::PipelineStage;
use crate::prompts::NO_FILE_SELECTED;
use crate::provider::{GeminiProvider, InferenceProvider};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Run the full pipeline for one submission.
///
/// # Arguments
/// * `upload`: the chosen image, or `None` when the user pressed the
///   button without selecting a file
/// * `config`: analysis configuration
///
/// # Returns
/// `Ok(AnalysisOutcome)` for every run that did not hit a fault, including
/// the two soft branches:
/// - no image → a single warning notice, nothing staged;
/// - staged file missing at upload time → an error notice, no report.
///
/// # Errors
/// Unsupported file types, staging I/O errors, and every provider failure.
/// The staged file is removed before the error is returned, and the
/// [`AnalysisFailure`] carries the notices raised up to that point (the
/// upload success notice, a cleanup warning).
pub async fn analyze(
    upload: Option<UploadedImage>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutcome, AnalysisFailure> {
    let total_start = Instant::now();
    let mut outcome = AnalysisOutcome::default();

    // ── Step 0: Was anything selected? ───────────────────────────────────
    let Some(upload) = upload else {
        debug!("Submission without an image");
        outcome.notices.push(Notice::warning(NO_FILE_SELECTED));
        return Ok(outcome);
    };
    info!(
        "Starting analysis: {} ({} bytes)",
        upload.filename,
        upload.bytes.len()
    );

    let provider = resolve_provider(config)?;

    // ── Step 1: Stage ────────────────────────────────────────────────────
    let staged = StagedFile::create(&config.staging_dir, &upload)?;
    outcome.stats.staged_bytes = staged.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_staged(staged.path(), staged.len());
        cb.on_stage(PipelineStage::Staged);
    }

    // ── Steps 2–4: Upload, prompt, render ────────────────────────────────
    let result = run_staged(&provider, &staged, &upload, config, &mut outcome).await;

    // ── Step 5: Cleanup, on every path ───────────────────────────────────
    match staged.cleanup() {
        Ok(path) => debug!("Removed staged file {}", path.display()),
        Err((path, e)) => {
            warn!("Failed to remove staged file {}: {}", path.display(), e);
            outcome
                .notices
                .push(Notice::warning(format!("Could not remove temporary file: {e}")));
        }
    }
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage(PipelineStage::Cleaned);
    }

    if let Err(error) = result {
        return Err(AnalysisFailure::new(error, outcome.notices));
    }

    outcome.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Analysis complete: {} in {}ms",
        if outcome.report.is_some() { "report" } else { "no report" },
        outcome.stats.total_duration_ms
    );
    Ok(outcome)
}

/// Read a local image and analyse it.
pub async fn analyze_file(
    path: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutcome, AnalysisFailure> {
    let upload = read_image(path.as_ref()).await?;
    analyze(Some(upload), config).await
}

/// Analyse a local image and write the report as Markdown to `output_path`.
///
/// Uses atomic write (temp file + rename) so a crash never leaves half a
/// report behind. Nothing is written when the run produced no report.
pub async fn analyze_file_to(
    path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutcome, AnalysisFailure> {
    let outcome = analyze_file(path, config).await?;
    let Some(ref report) = outcome.report else {
        return Ok(outcome);
    };

    match write_markdown(output_path.as_ref(), &report.to_markdown()).await {
        Ok(()) => Ok(outcome),
        Err(error) => Err(AnalysisFailure::new(error, outcome.notices)),
    }
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally; do not call from inside
/// an async context.
pub fn analyze_sync(
    upload: Option<UploadedImage>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutcome, AnalysisFailure> {
    tokio::runtime::Runtime::new()
        .map_err(|e| AnalysisError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze(upload, config))
}

/// Resolve the provider for `config`.
///
/// 1. **Pre-built provider** (`config.provider`): used as-is.
/// 2. **API key** (`config.api_key`): a [`GeminiProvider`] against
///    `config.api_base_url`.
///
/// Environment variables are read by the front ends, never here.
pub fn resolve_provider(config: &AnalysisConfig) -> Result<Arc<dyn InferenceProvider>, AnalysisError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    match config.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => Ok(Arc::new(GeminiProvider::new(
            key,
            config.api_base_url.clone(),
        )?)),
        _ => Err(AnalysisError::ProviderNotConfigured {
            provider: "gemini".to_string(),
            hint: "Set GEMINI_API_KEY or pass --api-key.".to_string(),
        }),
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Everything between staging and cleanup.
async fn run_staged(
    provider: &Arc<dyn InferenceProvider>,
    staged: &StagedFile,
    upload: &UploadedImage,
    config: &AnalysisConfig,
    outcome: &mut AnalysisOutcome,
) -> Result<(), AnalysisError> {
    let mime_type = config.mime_policy.resolve(upload);

    let upload_start = Instant::now();
    let handle = with_timeout(
        config.api_timeout_secs,
        "File upload",
        ingest::upload_staged(
            provider.as_ref(),
            staged.path(),
            &mime_type,
            &upload.filename,
            &mut outcome.notices,
        ),
    )
    .await?;
    outcome.stats.upload_duration_ms = upload_start.elapsed().as_millis() as u64;

    let Some(handle) = handle else {
        if let Some(ref cb) = config.progress_callback {
            cb.on_stage(PipelineStage::IngestFailed);
        }
        return Ok(());
    };
    if let Some(ref cb) = config.progress_callback {
        cb.on_uploaded(&handle);
        cb.on_stage(PipelineStage::Ingested);
    }

    let generation_start = Instant::now();
    let mut session = ChatSession::with_file(Arc::clone(provider), config, &handle);
    let response = with_timeout(
        config.api_timeout_secs,
        "generateContent",
        session.send_message(&config.prompt),
    )
    .await?;
    outcome.stats.generation_duration_ms = generation_start.elapsed().as_millis() as u64;
    outcome.stats.prompt_tokens = response.prompt_tokens;
    outcome.stats.output_tokens = response.output_tokens;

    if let Some(ref cb) = config.progress_callback {
        cb.on_response(response.text.len());
        cb.on_stage(PipelineStage::Responded);
    }

    outcome.report = Some(render::build_report(&response.text));
    outcome.file = Some(handle);
    Ok(())
}

async fn write_markdown(out: &Path, markdown: &str) -> Result<(), AnalysisError> {
    let write_failed = |source: std::io::Error| AnalysisError::OutputWriteFailed {
        path: out.to_path_buf(),
        source,
    };

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }
    let tmp_path = out.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, markdown)
        .await
        .map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, out).await.map_err(write_failed)
}

async fn read_image(path: &Path) -> Result<UploadedImage, AnalysisError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| AnalysisError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(UploadedImage::new(filename, bytes))
}
