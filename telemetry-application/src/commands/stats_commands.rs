use chrono::Utc;
use tracing::{debug, error, info};

use crate::{AppError, StatsState};
use telemetry_domain::services::merge_window;
use telemetry_domain::{EventStatistics, TimeRange};

/// Runs one aggregation window ending now. Returns `None` when another run
/// still holds the guard.
pub async fn refresh_statistics(state: &StatsState) -> Result<Option<EventStatistics>, AppError> {
    let Ok(_guard) = state.run_guard.try_lock() else {
        info!("statistics run already in progress, skipping tick");
        return Ok(None);
    };
    info!("starting periodic processing of statistics");

    let previous = state
        .stats_repo
        .load()
        .await
        .map_err(|err| {
            error!("failed to load statistics: {}", err);
            AppError::Internal(err)
        })?
        .unwrap_or_default();

    let window = TimeRange::new(previous.last_updated, Utc::now());
    debug!(start = %window.start, end = %window.end, "fetching statistics window");

    let players = state
        .event_source
        .fetch_player_events(window)
        .await
        .map_err(|err| {
            error!("failed to fetch player events: {}", err);
            AppError::Unavailable(err)
        })?;
    let servers = state
        .event_source
        .fetch_server_events(window)
        .await
        .map_err(|err| {
            error!("failed to fetch server events: {}", err);
            AppError::Unavailable(err)
        })?;
    info!(
        player_events = players.len(),
        server_events = servers.len(),
        "received new events"
    );

    let next = merge_window(&previous, &players, &servers, window.end);
    state.stats_repo.save(&next).await.map_err(|err| {
        error!("failed to save statistics: {}", err);
        AppError::Internal(err)
    })?;
    state.metrics.record_stats_run();
    info!(
        total_player_events = next.total_player_events,
        total_server_events = next.total_server_events,
        "updated statistics"
    );
    Ok(Some(next))
}
