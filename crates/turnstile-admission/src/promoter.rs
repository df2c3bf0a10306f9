//! Background task that drains the queue into free slots.

use std::sync::Arc;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use turnstile_session::TokenIssuer;

use crate::AdmissionController;

/// Runs promotion ticks until `cancel` fires.
///
/// Every `promote_interval` the task evicts idle sessions (when an idle
/// timeout is configured) and then promotes queue-front entries into
/// free slots. A tick that runs long skips the missed ones instead of
/// bursting to catch up.
///
/// Returns when the cancellation token is triggered. Spawn it with
/// `tokio::spawn` and keep the handle to await shutdown.
pub async fn run_promoter<T: TokenIssuer>(
    controller: Arc<AdmissionController<T>>,
    cancel: CancellationToken,
) {
    let period = controller.config().promote_interval;
    tracing::info!(
        interval_ms = period.as_millis() as u64,
        capacity = controller.config().capacity,
        "queue promoter started"
    );

    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = controller.promotion_tick().await;
                if !report.evicted.is_empty() || !report.promoted.is_empty() {
                    tracing::debug!(
                        evicted = report.evicted.len(),
                        promoted = report.promoted.len(),
                        "promotion tick"
                    );
                }
            }
            _ = cancel.cancelled() => {
                tracing::info!("queue promoter received shutdown signal, exiting");
                break;
            }
        }
    }
}
