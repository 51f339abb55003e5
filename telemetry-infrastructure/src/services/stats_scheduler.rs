use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use telemetry_application::commands::refresh_statistics;
use telemetry_application::StatsState;

/// Fires a statistics run every `stats_interval_seconds`. Each run is spawned
/// so a slow upstream never delays the ticker; overlapping ticks are skipped
/// by the run guard. On shutdown waits for an in-flight run to finish.
pub async fn schedule_statistics(state: StatsState, mut shutdown: watch::Receiver<bool>) {
    let period = Duration::from_secs(state.config.stats_interval_seconds);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(interval_seconds = state.config.stats_interval_seconds, "statistics scheduler started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }
        if *shutdown.borrow() {
            break;
        }
        let run_state = state.clone();
        tokio::spawn(async move {
            if let Err(err) = refresh_statistics(&run_state).await {
                error!("statistics run failed: {}", err);
            }
        });
    }

    let _drained = state.run_guard.lock().await;
    info!("statistics scheduler stopped");
}
