use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::warn;

use telemetry_application::commands::publish_event;
use telemetry_application::{AppError, LogState};
use telemetry_domain::EventKind;

use crate::error::HttpError;
use crate::middleware::{idempotency_key, parse_inbound};

pub const TRACE_ID_HEADER: &str = "x-trace-id";

pub async fn post_player_event(
    State(state): State<LogState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, HttpError> {
    publish(&state, EventKind::PlayerEvent, &headers, &body).await
}

pub async fn post_server_event(
    State(state): State<LogState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, HttpError> {
    publish(&state, EventKind::ServerEvent, &headers, &body).await
}

async fn publish(
    state: &LogState,
    kind: EventKind,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, HttpError> {
    let inbound =
        parse_inbound(kind, headers, body, state.config.max_body_bytes).map_err(|err| {
            warn!("failed to parse {} body: {}", kind, err);
            HttpError::BadRequest(err.to_string())
        })?;
    inbound.validate().map_err(|msg| {
        warn!("rejected {}: {}", kind, msg);
        HttpError::BadRequest(msg)
    })?;

    let receipt = publish_event(state, inbound, idempotency_key(headers))
        .await
        .map_err(AppError::from)?;
    Ok((StatusCode::CREATED, [(TRACE_ID_HEADER, receipt.trace_id)]).into_response())
}
