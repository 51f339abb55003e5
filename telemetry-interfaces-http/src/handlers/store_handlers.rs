use axum::extract::{Query, State};
use axum::Json;

use telemetry_application::queries::event_queries;
use telemetry_application::StoreState;
use telemetry_domain::{PlayerEvent, ServerEvent, TimeRangeQuery};

use crate::error::HttpError;

pub async fn list_player_events(
    State(state): State<StoreState>,
    Query(query): Query<TimeRangeQuery>,
) -> Result<Json<Vec<PlayerEvent>>, HttpError> {
    let rows = event_queries::list_player_events(&state, query).await?;
    Ok(Json(rows))
}

pub async fn list_server_events(
    State(state): State<StoreState>,
    Query(query): Query<TimeRangeQuery>,
) -> Result<Json<Vec<ServerEvent>>, HttpError> {
    let rows = event_queries::list_server_events(&state, query).await?;
    Ok(Json(rows))
}
