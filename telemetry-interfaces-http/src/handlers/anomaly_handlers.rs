use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use telemetry_application::commands::update_anomalies;
use telemetry_application::queries::anomaly_queries;
use telemetry_application::AnomalyState;
use telemetry_domain::AnomalyQuery;

use crate::error::HttpError;

pub async fn run_update(State(state): State<AnomalyState>) -> Result<Response, HttpError> {
    let summary = update_anomalies(&state).await?;
    Ok((StatusCode::CREATED, Json(summary)).into_response())
}

pub async fn list_anomalies(
    State(state): State<AnomalyState>,
    Query(query): Query<AnomalyQuery>,
) -> Result<Response, HttpError> {
    let anomalies = anomaly_queries::list_anomalies(&state, query).await?;
    if anomalies.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok(Json(anomalies).into_response())
}
