//! Delay primitive used between retry attempts.

use std::time::Duration;
use tokio::time::sleep;

/// Suspend the current task for `duration`.
///
/// Only the calling task is parked; other tasks on the runtime keep
/// running. The future completes exactly once and cannot be cancelled
/// other than by dropping it.
pub async fn delay(duration: Duration) {
    if duration.is_zero() {
        tokio::task::yield_now().await;
        return;
    }
    sleep(duration).await;
}

/// Suspend for a number of milliseconds.
pub async fn delay_ms(millis: u64) {
    delay(Duration::from_millis(millis)).await;
}
