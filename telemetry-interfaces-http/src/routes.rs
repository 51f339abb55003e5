use std::time::Duration;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use telemetry_application::{AnomalyState, LogState, ServiceState, StatsState, StoreState};
use telemetry_domain::RuntimeConfig;

use crate::handlers::{
    anomaly_handlers, ingest_handlers, ops_handlers, query_handlers, stats_handlers,
    store_handlers,
};

fn ops_routes<S: ServiceState>() -> Router<S> {
    Router::new()
        .route("/health/live", get(ops_handlers::health_live))
        .route("/health/ready", get(ops_handlers::health_ready::<S>))
        .route("/metrics", get(ops_handlers::metrics_prometheus::<S>))
}

/// Shared middleware stack for every service router.
pub fn with_layers(router: Router, config: &RuntimeConfig) -> Router {
    router
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(
            usize::try_from(config.max_body_bytes).unwrap_or(usize::MAX),
        ))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_seconds,
        )))
        .layer(TraceLayer::new_for_http())
}

pub fn build_ingress_router(state: LogState) -> Router {
    let config = state.config.clone();
    let router = Router::new()
        .route("/player-event", post(ingest_handlers::post_player_event))
        .route("/server-event", post(ingest_handlers::post_server_event))
        .merge(ops_routes())
        .with_state(state);
    with_layers(router, &config)
}

pub fn build_store_router(state: StoreState) -> Router {
    let config = state.config.clone();
    let router = Router::new()
        .route("/player-events", get(store_handlers::list_player_events))
        .route("/server-events", get(store_handlers::list_server_events))
        .merge(ops_routes())
        .with_state(state);
    with_layers(router, &config)
}

pub fn build_stats_router(state: StatsState) -> Router {
    let config = state.config.clone();
    let router = Router::new()
        .route("/stats", get(stats_handlers::get_stats))
        .merge(ops_routes())
        .with_state(state);
    with_layers(router, &config)
}

pub fn build_query_router(state: LogState) -> Router {
    let config = state.config.clone();
    let router = Router::new()
        .route("/player-event", get(query_handlers::get_player_event))
        .route("/server-event", get(query_handlers::get_server_event))
        .route("/event-stats", get(query_handlers::get_event_stats))
        .merge(ops_routes())
        .with_state(state);
    with_layers(router, &config)
}

pub fn build_anomaly_router(state: AnomalyState) -> Router {
    let config = state.config.clone();
    let router = Router::new()
        .route("/update", put(anomaly_handlers::run_update))
        .route("/anomalies", get(anomaly_handlers::list_anomalies))
        .merge(ops_routes())
        .with_state(state);
    with_layers(router, &config)
}
