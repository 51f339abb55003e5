use chrono::{DateTime, Utc};

use crate::entities::{EventStatistics, PlayerEvent, ServerEvent};

/// Folds one aggregation window into the running statistics.
///
/// Counts accumulate and the maximum score only moves up when the window has
/// player events. `avg_cpu_usage` is the mean of this window's server events
/// and replaces the previous value; it is not a running mean. The watermark
/// never moves backwards.
pub fn merge_window(
    previous: &EventStatistics,
    players: &[PlayerEvent],
    servers: &[ServerEvent],
    window_end: DateTime<Utc>,
) -> EventStatistics {
    let mut next = previous.clone();

    if let Some(batch_max) = players.iter().map(|event| event.score).max() {
        next.total_player_events += players.len() as u64;
        next.max_player_score = next.max_player_score.max(batch_max);
    }

    if !servers.is_empty() {
        next.total_server_events += servers.len() as u64;
        let sum: f64 = servers.iter().map(|event| event.cpu_usage).sum();
        next.avg_cpu_usage = sum / servers.len() as f64;
    }

    next.last_updated = previous.last_updated.max(window_end);
    next
}
