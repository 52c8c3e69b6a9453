//! Fire-and-forget notification dispatch.
//!
//! Each dispatch runs as its own tokio task bounded by a timeout. The
//! outcome is logged and otherwise dropped: no retry, no propagation.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;
use warden_core::error::WardenResult;

/// Spawn `send` and log its outcome under `op`.
///
/// The returned handle may be dropped; the task keeps running.
pub fn spawn_notification<F>(
    op: &'static str,
    user_id: Uuid,
    timeout: Duration,
    send: F,
) -> JoinHandle<()>
where
    F: Future<Output = WardenResult<()>> + Send + 'static,
{
    tokio::spawn(async move {
        match tokio::time::timeout(timeout, send).await {
            Ok(Ok(())) => debug!(op, user_id = %user_id, "Notification dispatched"),
            Ok(Err(e)) => warn!(op, user_id = %user_id, error = %e, "Notification failed"),
            Err(_) => warn!(
                op,
                user_id = %user_id,
                timeout_secs = timeout.as_secs(),
                "Notification timed out"
            ),
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use warden_core::error::WardenError;

    use super::*;

    #[tokio::test]
    async fn successful_send_runs_to_completion() {
        let sent = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&sent);
        spawn_notification("test", Uuid::new_v4(), Duration::from_secs(1), async move {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap();
        assert!(sent.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn failure_is_contained() {
        let handle = spawn_notification("test", Uuid::new_v4(), Duration::from_secs(1), async {
            Err(WardenError::Notification("smtp down".into()))
        });
        assert!(handle.await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_send_is_cut_off() {
        let handle = spawn_notification("test", Uuid::new_v4(), Duration::from_secs(1), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        });
        assert!(handle.await.is_ok());
    }
}
