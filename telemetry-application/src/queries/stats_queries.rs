use tracing::error;

use crate::{AppError, StatsState};
use telemetry_domain::EventStatistics;

pub async fn get_statistics(state: &StatsState) -> Result<EventStatistics, AppError> {
    state
        .stats_repo
        .load()
        .await
        .map_err(|err| {
            error!("failed to load statistics: {}", err);
            AppError::Internal(err)
        })?
        .ok_or_else(|| AppError::NotFound("statistics have not been computed yet".to_string()))
}
