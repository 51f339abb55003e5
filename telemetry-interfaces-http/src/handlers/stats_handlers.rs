use axum::extract::State;
use axum::Json;

use telemetry_application::queries::stats_queries;
use telemetry_application::StatsState;
use telemetry_domain::EventStatistics;

use crate::error::HttpError;

pub async fn get_stats(State(state): State<StatsState>) -> Result<Json<EventStatistics>, HttpError> {
    let stats = stats_queries::get_statistics(&state).await?;
    Ok(Json(stats))
}
