//! Remote ingestion: hand the staged file to the provider.

use crate::error::AnalysisError;
use crate::output::{FileHandle, Notice};
use crate::prompts::{uploaded_notice, STAGED_FILE_MISSING};
use crate::provider::InferenceProvider;
use std::path::Path;
use tracing::{info, warn};

/// Upload the staged file at `path`.
///
/// Returns `Ok(None)` without contacting the provider when `path` does not
/// exist; the user is told through an error notice. Provider failures
/// propagate unchanged and are not retried.
pub async fn upload_staged(
    provider: &dyn InferenceProvider,
    path: &Path,
    mime_type: &str,
    display_name: &str,
    notices: &mut Vec<Notice>,
) -> Result<Option<FileHandle>, AnalysisError> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        warn!("Staged file missing at upload time: {}", path.display());
        notices.push(Notice::error(STAGED_FILE_MISSING));
        return Ok(None);
    }

    let handle = provider.upload_file(path, mime_type, display_name).await?;
    info!(
        "Uploaded '{}' to {} as {} ({})",
        handle.display_name,
        provider.name(),
        handle.uri,
        mime_type
    );
    notices.push(Notice::success(uploaded_notice(
        &handle.display_name,
        &handle.uri,
    )));
    Ok(Some(handle))
}
