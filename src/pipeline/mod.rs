//! Pipeline stages for one analysis run.
//!
//! Each submodule implements exactly one step of the run, so each can be
//! tested without the others.
//!
//! ## Data Flow
//!
//! ```text
//! stage ──▶ ingest ──▶ session ──▶ render
//! (disk)    (upload)   (prompt)    (report)
//!   └──────────── cleanup on every exit ────────────┘
//! ```
//!
//! 1. [`stage`]:   write the uploaded bytes to a randomly named temp file
//! 2. [`ingest`]:  hand the staged file to the provider's file endpoint
//! 3. [`session`]: seed a chat with the file and send the fixed prompt
//! 4. [`render`]:  turn the answer into a report section

pub mod ingest;
pub mod render;
pub mod session;
pub mod stage;

use crate::error::AnalysisError;
use std::future::Future;
use tokio::time::{timeout, Duration};

/// Await `fut`, bounded by `secs` when a bound is configured.
///
/// Without a bound the remote call is awaited indefinitely; dropping the
/// returned future is the only way to abandon it.
pub async fn with_timeout<T, F>(
    secs: Option<u64>,
    operation: &str,
    fut: F,
) -> Result<T, AnalysisError>
where
    F: Future<Output = Result<T, AnalysisError>>,
{
    match secs {
        None => fut.await,
        Some(secs) => timeout(Duration::from_secs(secs), fut)
            .await
            .map_err(|_| AnalysisError::ApiTimeout {
                operation: operation.to_string(),
                secs,
            })?,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unbounded_passes_through() {
        let v = with_timeout(None, "op", async { Ok::<_, AnalysisError>(7) })
            .await
            .unwrap();
        assert_eq!(v, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_times_out() {
        let err = with_timeout(Some(1), "generateContent", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, AnalysisError>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AnalysisError::ApiTimeout { secs: 1, .. }));
    }
}
