use tracing::error;

use crate::{AnomalyState, AppError};
use telemetry_domain::{AnomalyEventType, AnomalyQuery, AnomalyRecord};

/// Empty result is a valid answer; the handler decides how to render it.
pub async fn list_anomalies(
    state: &AnomalyState,
    query: AnomalyQuery,
) -> Result<Vec<AnomalyRecord>, AppError> {
    let snapshot = state
        .anomaly_repo
        .load_snapshot()
        .await
        .map_err(|err| {
            error!("failed to read anomaly snapshot: {}", err);
            AppError::Internal(err)
        })?
        .ok_or_else(|| AppError::NotFound("anomaly detection has not run yet".to_string()))?;

    let filter = match query
        .event_type
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        Some(raw) => Some(raw.parse::<AnomalyEventType>().map_err(AppError::BadRequest)?),
        None => None,
    };

    Ok(match filter {
        Some(event_type) => snapshot
            .into_iter()
            .filter(|anomaly| anomaly.event_type == event_type)
            .collect(),
        None => snapshot,
    })
}
