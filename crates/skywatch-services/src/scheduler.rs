//! Periodic refresh driver.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::orchestrator::RefreshOrchestrator;

/// Default sweep period
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(600);

const MIN_REFRESH_PERIOD: Duration = Duration::from_secs(1);

/// Spawn a task that calls [`RefreshOrchestrator::refresh_all`] every `period`
/// until `cancel` fires.
///
/// With `run_immediately` the first sweep starts right away, otherwise after
/// one period. Ticks missed during a long sweep are skipped rather than
/// replayed. Cancellation also interrupts a sweep in progress.
pub fn spawn_refresh_loop(
    orchestrator: Arc<RefreshOrchestrator>,
    period: Duration,
    run_immediately: bool,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let period = period.max(MIN_REFRESH_PERIOD);

    tokio::spawn(async move {
        let start = if run_immediately {
            tokio::time::Instant::now()
        } else {
            tokio::time::Instant::now() + period
        };
        let mut ticker = tokio::time::interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!("Refresh loop started, every {}s", period.as_secs());

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                report = orchestrator.refresh_all() => {
                    if report.is_none() {
                        tracing::debug!("Tick skipped, previous sweep still running");
                    }
                }
            }
        }

        tracing::info!("Refresh loop stopped");
    })
}
