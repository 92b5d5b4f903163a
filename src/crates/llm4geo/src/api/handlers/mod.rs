//! API request handlers

pub mod chat;
pub mod functions;
pub mod health;

pub use chat::{data_chat, qgis_chat};
pub use functions::{get_function, list_functions, project_schema};
pub use health::{health, health_detailed};

use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Drive `work` to completion, cancelling `cancel` once `deadline` passes.
///
/// After cancellation the work is still awaited so it can unwind; the
/// extractor observes the token and returns promptly.
pub(crate) async fn run_with_deadline<F, T>(
    deadline: Duration,
    cancel: &CancellationToken,
    work: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::pin!(work);
    tokio::select! {
        result = &mut work => result,
        _ = tokio::time::sleep(deadline) => {
            tracing::warn!(deadline_secs = deadline.as_secs_f64(), "Request deadline elapsed, cancelling");
            cancel.cancel();
            work.await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;

    #[tokio::test]
    async fn test_fast_work_is_not_cancelled() {
        let cancel = CancellationToken::new();
        let value = run_with_deadline(Duration::from_secs(5), &cancel, async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cancels_token() {
        let cancel = CancellationToken::new();
        let observed = cancel.clone();
        let result: Result<()> = run_with_deadline(Duration::from_secs(1), &cancel, async move {
            observed.cancelled().await;
            Err(ProtocolError::Cancelled)
        })
        .await;

        assert!(matches!(result, Err(ProtocolError::Cancelled)));
        assert!(cancel.is_cancelled());
    }
}
