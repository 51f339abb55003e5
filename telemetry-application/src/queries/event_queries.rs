use tracing::error;

use crate::{AppError, StoreState};
use telemetry_domain::utils::parse_timestamp;
use telemetry_domain::{PlayerEvent, ServerEvent, TimeRange, TimeRangeQuery};

/// Both bounds are required; `start >= end` is a valid, empty window.
pub fn parse_time_range(query: &TimeRangeQuery) -> Result<TimeRange, AppError> {
    let start = required_timestamp("start_timestamp", query.start_timestamp.as_deref())?;
    let end = required_timestamp("end_timestamp", query.end_timestamp.as_deref())?;
    Ok(TimeRange::new(start, end))
}

fn required_timestamp(
    name: &str,
    value: Option<&str>,
) -> Result<chrono::DateTime<chrono::Utc>, AppError> {
    let raw = value
        .filter(|raw| !raw.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{} is required", name)))?;
    parse_timestamp(raw).map_err(|err| AppError::BadRequest(format!("{}: {}", name, err)))
}

pub async fn list_player_events(
    state: &StoreState,
    query: TimeRangeQuery,
) -> Result<Vec<PlayerEvent>, AppError> {
    let range = parse_time_range(&query)?;
    if range.is_empty() {
        return Ok(Vec::new());
    }
    state
        .event_repo
        .fetch_player_events(range)
        .await
        .map_err(|err| {
            error!("failed to fetch player events: {}", err);
            AppError::Internal(err)
        })
}

pub async fn list_server_events(
    state: &StoreState,
    query: TimeRangeQuery,
) -> Result<Vec<ServerEvent>, AppError> {
    let range = parse_time_range(&query)?;
    if range.is_empty() {
        return Ok(Vec::new());
    }
    state
        .event_repo
        .fetch_server_events(range)
        .await
        .map_err(|err| {
            error!("failed to fetch server events: {}", err);
            AppError::Internal(err)
        })
}
