//! Error types for the swasticare library.
//!
//! Only faults live here. The two "soft" outcomes of a run (no image
//! selected, staged file vanished before upload) are reported to the user
//! as [`crate::output::Notice`]s inside a successful
//! [`crate::output::AnalysisOutcome`], because the page keeps working and
//! the user simply tries again.
//!
//! Everything else, from a bad file extension to a rejected API key, is an
//! [`AnalysisError`] and aborts the current run. The staged file is still
//! removed on the way out.

use crate::output::Notice;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the swasticare library.
#[derive(Debug, Error)]
pub enum AnalysisError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The uploaded filename does not end in one of the accepted image extensions.
    #[error("Unsupported image type for '{filename}': expected one of png, jpg, jpeg")]
    UnsupportedImageType { filename: String },

    /// Could not read a local image given on the command line.
    #[error("Failed to read image '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Staging errors ────────────────────────────────────────────────────
    /// The uploaded bytes could not be written to the staging directory.
    #[error("Failed to stage upload in '{path}': {source}")]
    StagingFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Provider errors ───────────────────────────────────────────────────
    /// No provider was injected and no API key is configured.
    #[error("Inference provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The file-ingestion endpoint refused or failed the upload.
    #[error("Upload of '{path}' failed: {reason}")]
    UploadFailed { path: PathBuf, reason: String },

    /// The request never got an HTTP answer (DNS, TLS, connection reset…).
    #[error("{operation} request failed: {detail}")]
    RequestFailed { operation: String, detail: String },

    /// The provider rejected the credential (HTTP 401/403).
    #[error("Authentication error from provider '{provider}': {detail}")]
    AuthError { provider: String, detail: String },

    /// HTTP 429. Not retried; `retry_after_secs` is informational only.
    #[error("Rate limit exceeded for provider '{provider}'")]
    RateLimitExceeded {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    /// Any other non-success answer from the provider.
    #[error("Provider API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The model answered but produced no text part.
    #[error("Model returned no text{}", .finish_reason.as_deref().map(|r| format!(" (finish reason: {r})")).unwrap_or_default())]
    EmptyResponse { finish_reason: Option<String> },

    /// A remote call exceeded the opt-in `api_timeout_secs` bound.
    #[error("{operation} timed out after {secs}s")]
    ApiTimeout { operation: String, secs: u64 },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output report file.
    #[error("Failed to write report file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalysisError {
    /// True when the caller supplied something unusable, as opposed to a
    /// remote or environmental fault.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            AnalysisError::UnsupportedImageType { .. } | AnalysisError::ReadFailed { .. }
        )
    }
}

/// A run that ended in an [`AnalysisError`], with the notices raised
/// before the fault.
///
/// A run can fail after the upload already succeeded. The success notice
/// (the remote file exists) and any cleanup warning are still shown to the
/// user above the error.
#[derive(Debug)]
pub struct AnalysisFailure {
    pub error: AnalysisError,
    pub notices: Vec<Notice>,
}

impl AnalysisFailure {
    pub fn new(error: AnalysisError, notices: Vec<Notice>) -> Self {
        Self { error, notices }
    }
}

impl From<AnalysisError> for AnalysisFailure {
    fn from(error: AnalysisError) -> Self {
        Self::new(error, Vec::new())
    }
}

impl fmt::Display for AnalysisFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for AnalysisFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_image_type_display() {
        let e = AnalysisError::UnsupportedImageType {
            filename: "scan.gif".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("scan.gif"), "got: {msg}");
        assert!(msg.contains("png, jpg, jpeg"));
    }

    #[test]
    fn empty_response_display_with_reason() {
        let e = AnalysisError::EmptyResponse {
            finish_reason: Some("SAFETY".into()),
        };
        assert_eq!(e.to_string(), "Model returned no text (finish reason: SAFETY)");
    }

    #[test]
    fn empty_response_display_without_reason() {
        let e = AnalysisError::EmptyResponse {
            finish_reason: None,
        };
        assert_eq!(e.to_string(), "Model returned no text");
    }

    #[test]
    fn api_timeout_display() {
        let e = AnalysisError::ApiTimeout {
            operation: "generateContent".into(),
            secs: 30,
        };
        assert_eq!(e.to_string(), "generateContent timed out after 30s");
    }

    #[test]
    fn input_errors_are_classified() {
        assert!(AnalysisError::UnsupportedImageType {
            filename: "a.txt".into()
        }
        .is_input_error());
        assert!(!AnalysisError::AuthError {
            provider: "gemini".into(),
            detail: "bad key".into()
        }
        .is_input_error());
        assert!(!AnalysisError::RateLimitExceeded {
            provider: "gemini".into(),
            retry_after_secs: None
        }
        .is_input_error());
    }

    #[test]
    fn failure_displays_inner_error_and_keeps_notices() {
        let failure = AnalysisFailure::new(
            AnalysisError::ApiError {
                status: 500,
                message: "boom".into(),
            },
            vec![Notice::success("uploaded")],
        );
        assert_eq!(failure.to_string(), "Provider API error (HTTP 500): boom");
        assert_eq!(failure.notices.len(), 1);

        let bare: AnalysisFailure = AnalysisError::Internal("x".into()).into();
        assert!(bare.notices.is_empty());
    }
}
