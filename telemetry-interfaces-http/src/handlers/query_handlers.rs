use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;

use telemetry_application::queries::log_queries;
use telemetry_application::LogState;
use telemetry_domain::{EventEnvelope, EventKind, IndexQuery, LogEventCounts};

use crate::error::HttpError;

fn required_index(query: Result<Query<IndexQuery>, QueryRejection>) -> Result<u64, HttpError> {
    let Query(query) = query.map_err(|err| HttpError::BadRequest(err.body_text()))?;
    query
        .index
        .ok_or_else(|| HttpError::BadRequest("index is required".to_string()))
}

pub async fn get_player_event(
    State(state): State<LogState>,
    query: Result<Query<IndexQuery>, QueryRejection>,
) -> Result<Json<EventEnvelope>, HttpError> {
    let index = required_index(query)?;
    let envelope = log_queries::find_event(&state, EventKind::PlayerEvent, index).await?;
    Ok(Json(envelope))
}

pub async fn get_server_event(
    State(state): State<LogState>,
    query: Result<Query<IndexQuery>, QueryRejection>,
) -> Result<Json<EventEnvelope>, HttpError> {
    let index = required_index(query)?;
    let envelope = log_queries::find_event(&state, EventKind::ServerEvent, index).await?;
    Ok(Json(envelope))
}

pub async fn get_event_stats(
    State(state): State<LogState>,
) -> Result<Json<LogEventCounts>, HttpError> {
    let counts = log_queries::count_events(&state).await?;
    Ok(Json(counts))
}
