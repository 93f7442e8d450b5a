//! Progress-callback trait for pipeline state changes.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalysisConfigBuilder::progress_callback`] to observe a
//! run as it moves through its states:
//!
//! ```text
//! Idle → Staged → Ingested → Responded → Cleaned
//!               ↘ IngestFailed ─────────↗
//! ```
//!
//! The CLI uses this to drive a spinner; tests use it to assert that every
//! run ends in [`PipelineStage::Cleaned`].
//!
//! # Example
//!
//! ```rust
//! use swasticare::{AnalysisConfig, AnalysisProgressCallback, PipelineStage};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Recorder {
//!     stages: Mutex<Vec<PipelineStage>>,
//! }
//!
//! impl AnalysisProgressCallback for Recorder {
//!     fn on_stage(&self, stage: PipelineStage) {
//!         self.stages.lock().unwrap().push(stage);
//!     }
//! }
//!
//! let config = AnalysisConfig::builder()
//!     .progress_callback(Arc::new(Recorder::default()))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::FileHandle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// States of one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    /// Bytes written to the staging file.
    Staged,
    /// The provider accepted the upload and returned a handle.
    Ingested,
    /// The staged file was missing at upload time; nothing was sent.
    IngestFailed,
    /// The model answered the prompt.
    Responded,
    /// The staging file has been removed.
    Cleaned,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStage::Staged => "staged",
            PipelineStage::Ingested => "ingested",
            PipelineStage::IngestFailed => "ingest-failed",
            PipelineStage::Responded => "responded",
            PipelineStage::Cleaned => "cleaned",
        };
        f.write_str(s)
    }
}

/// Called by the pipeline as a run progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Runs are sequential, but the callback is shared
/// through an `Arc` across requests and must be `Send + Sync`.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called on every state transition, after the more specific hook below.
    fn on_stage(&self, stage: PipelineStage) {
        let _ = stage;
    }

    /// Called once the upload has been written to `path`.
    fn on_staged(&self, path: &Path, bytes: usize) {
        let _ = (path, bytes);
    }

    /// Called when the provider returns a handle for the staged file.
    fn on_uploaded(&self, handle: &FileHandle) {
        let _ = handle;
    }

    /// Called with the length in bytes of the model's answer.
    fn on_response(&self, text_len: usize) {
        let _ = text_len;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalysisConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        stages: Mutex<Vec<PipelineStage>>,
        staged_bytes: AtomicUsize,
        response_len: AtomicUsize,
    }

    impl AnalysisProgressCallback for TrackingCallback {
        fn on_stage(&self, stage: PipelineStage) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_staged(&self, _path: &Path, bytes: usize) {
            self.staged_bytes.store(bytes, Ordering::SeqCst);
        }

        fn on_response(&self, text_len: usize) {
            self.response_len.store(text_len, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage(PipelineStage::Staged);
        cb.on_staged(Path::new("temp_x.png"), 10);
        cb.on_uploaded(&FileHandle {
            name: "files/1".into(),
            display_name: "x.png".into(),
            uri: "https://example/files/1".into(),
            mime_type: "image/png".into(),
        });
        cb.on_response(42);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_staged(Path::new("temp_a.png"), 512);
        tracker.on_stage(PipelineStage::Staged);
        tracker.on_stage(PipelineStage::Ingested);
        tracker.on_response(77);
        tracker.on_stage(PipelineStage::Responded);
        tracker.on_stage(PipelineStage::Cleaned);

        assert_eq!(tracker.staged_bytes.load(Ordering::SeqCst), 512);
        assert_eq!(tracker.response_len.load(Ordering::SeqCst), 77);
        assert_eq!(
            *tracker.stages.lock().unwrap(),
            vec![
                PipelineStage::Staged,
                PipelineStage::Ingested,
                PipelineStage::Responded,
                PipelineStage::Cleaned
            ]
        );
    }

    #[test]
    fn stage_display() {
        assert_eq!(PipelineStage::IngestFailed.to_string(), "ingest-failed");
        assert_eq!(PipelineStage::Cleaned.to_string(), "cleaned");
    }
}
