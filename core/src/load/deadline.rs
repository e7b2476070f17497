use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Fires `cancel` once `duration` has elapsed. Returns early, without doing
/// anything, if the token is cancelled by someone else first.
pub fn spawn_deadline(duration: Duration, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {
                tracing::info!(duration_ms = duration.as_millis() as u64, "deadline reached");
                cancel.cancel();
            }
            _ = cancel.cancelled() => {}
        }
    })
}
