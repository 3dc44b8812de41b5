//! Scheduled jobs

pub mod extraction;

use crate::AppState;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Run the extraction job every `period` until `shutdown` is cancelled
///
/// The first run happens one period after start. Runs never overlap: a run
/// that outlasts the period delays the next one.
pub fn spawn_scheduler(state: AppState, period: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting extraction job scheduler (every {}s)", period.as_secs());

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Extraction job scheduler stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match extraction::run(&state).await {
                        Ok(summary) => info!(
                            created = summary.created.len(),
                            failed = summary.failed.len(),
                            "Extraction job finished"
                        ),
                        Err(e) => error!(kind = e.kind_name(), error = %e, "Extraction job failed"),
                    }
                }
            }
        }
    })
}
