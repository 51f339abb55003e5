use std::io::Write;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;
use tower::ServiceExt;

use telemetry_application::{AnomalyState, LogState, Metrics, StatsState, StoreState};
use telemetry_domain::ports::{EventLog, EventRepository};
use telemetry_domain::{PlayerActivity, RuntimeConfig};
use telemetry_infrastructure::{
    InMemoryEventLog, JsonAnomalyRepository, JsonStatsRepository, SqliteEventStore,
};
use telemetry_interfaces_http::{
    build_anomaly_router, build_ingress_router, build_query_router, build_stats_router,
    build_store_router, TRACE_ID_HEADER,
};

fn config() -> RuntimeConfig {
    RuntimeConfig {
        log_idle_timeout_ms: 20,
        max_body_bytes: 4096,
        ..RuntimeConfig::default()
    }
}

fn log_state(log: &InMemoryEventLog) -> LogState {
    LogState {
        config: config(),
        event_log: Arc::new(log.clone()),
        metrics: Arc::new(Metrics::default()),
    }
}

fn player_body(score: i64) -> Value {
    json!({
        "player_id": "player-7",
        "server_id": "eu-1",
        "action": "match_end",
        "score": score,
        "timestamp": "2025-05-01T12:00:00Z"
    })
}

fn server_body(cpu_usage: f64) -> Value {
    json!({
        "server_id": "eu-1",
        "uptime": 3600,
        "cpu_usage": cpu_usage,
        "memory_usage": 512.0,
        "timestamp": "2025-05-01 12:00:00"
    })
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.expect("response")
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request")
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

#[tokio::test]
async fn ingress_accepts_valid_events() {
    let log = InMemoryEventLog::new();
    let router = build_ingress_router(log_state(&log));

    let response = send(&router, post_json("/player-event", &player_body(10))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(response.headers().contains_key(TRACE_ID_HEADER));

    let response = send(&router, post_json("/server-event", &server_body(12.5))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(log.len(), 2);
}

#[tokio::test]
async fn ingress_rejects_invalid_bodies() {
    let log = InMemoryEventLog::new();
    let router = build_ingress_router(log_state(&log));

    let mut missing_score = player_body(1);
    missing_score.as_object_mut().expect("object").remove("score");
    let response = send(&router, post_json("/player-event", &missing_score)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());

    let response = send(&router, post_json("/server-event", &server_body(-1.0))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&router, post_json("/server-event", &player_body(1))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut long_id = player_body(1);
    long_id["player_id"] = json!("x".repeat(51));
    let response = send(&router, post_json("/player-event", &long_id)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(log.is_empty());
}

#[tokio::test]
async fn ingress_inflates_gzip_bodies() {
    let log = InMemoryEventLog::new();
    let router = build_ingress_router(log_state(&log));
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(player_body(4).to_string().as_bytes())
        .expect("write");
    let request = Request::post("/player-event")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_ENCODING, "gzip")
        .body(Body::from(encoder.finish().expect("finish")))
        .expect("request");

    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(log.len(), 1);
}

#[tokio::test]
async fn idempotency_key_pins_the_trace_id() {
    let log = InMemoryEventLog::new();
    let router = build_ingress_router(log_state(&log));
    let request = || {
        Request::post("/player-event")
            .header(header::CONTENT_TYPE, "application/json")
            .header("Idempotency-Key", "retry-me")
            .body(Body::from(player_body(3).to_string()))
            .expect("request")
    };

    let first = send(&router, request()).await;
    let second = send(&router, request()).await;
    assert_eq!(
        first.headers()[TRACE_ID_HEADER],
        second.headers()[TRACE_ID_HEADER]
    );
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let log = InMemoryEventLog::new();
    let router = build_ingress_router(log_state(&log));
    let mut body = player_body(1);
    body["padding"] = json!("x".repeat(8192));
    let response = send(&router, post_json("/player-event", &body)).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn gzip_body_inflating_past_the_limit_is_rejected() {
    let log = InMemoryEventLog::new();
    let router = build_ingress_router(log_state(&log));
    let mut body = player_body(2);
    body["padding"] = json!(" ".repeat(256 * 1024));
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body.to_string().as_bytes()).expect("write");
    let compressed = encoder.finish().expect("finish");
    assert!(compressed.len() < 4096);

    let request = Request::post("/player-event")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_ENCODING, "gzip")
        .body(Body::from(compressed))
        .expect("request");
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(log.is_empty());
}

#[tokio::test]
async fn query_service_reads_by_index() {
    let log = InMemoryEventLog::new();
    let ingress = build_ingress_router(log_state(&log));
    for score in [1, 2, 3] {
        send(&ingress, post_json("/player-event", &player_body(score))).await;
    }
    send(&ingress, post_json("/server-event", &server_body(50.0))).await;
    let query = build_query_router(log_state(&log));

    let response = send(&query, get("/player-event?index=2")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let envelope = json_body(response).await;
    assert_eq!(envelope["type"], "player_event");
    assert_eq!(envelope["payload"]["score"], 3);

    let response = send(&query, get("/player-event?index=3")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&query, get("/server-event")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&query, get("/server-event?index=-1")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&query, get("/event-stats")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"num_player_events": 3, "num_server_events": 1})
    );
}

#[tokio::test]
async fn index_zero_on_empty_log_is_not_found() {
    let log = InMemoryEventLog::new();
    let query = build_query_router(log_state(&log));
    let response = send(&query, get("/player-event?index=0")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

async fn anomaly_router(log: &InMemoryEventLog) -> (Router, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = AnomalyState::new(
        config(),
        Arc::new(log.clone()),
        Arc::new(JsonAnomalyRepository::new(dir.path().join("anomalies.json"))),
        Arc::new(Metrics::default()),
    );
    (build_anomaly_router(state), dir)
}

#[tokio::test]
async fn anomaly_service_lifecycle() {
    let log = InMemoryEventLog::new();
    let (router, _dir) = anomaly_router(&log).await;

    let response = send(&router, get("/anomalies")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = send(&router, get("/anomalies?event_type=DiskEvent")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let update = || Request::put("/update").body(Body::empty()).expect("request");
    let response = send(&router, update()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await, json!({"anomalies_count": 0}));

    let response = send(&router, get("/anomalies")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let ingress = build_ingress_router(log_state(&log));
    send(&ingress, post_json("/player-event", &player_body(2_000_000))).await;
    send(&ingress, post_json("/server-event", &server_body(99.0))).await;
    let response = send(&router, update()).await;
    assert_eq!(json_body(response).await, json!({"anomalies_count": 2}));

    let response = send(&router, get("/anomalies?event_type=PlayerActivityEvent")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let listed = json_body(response).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    assert_eq!(listed[0]["event_type"], "PlayerActivityEvent");

    let response = send(&router, get("/anomalies?event_type=DiskEvent")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stats_service_returns_not_found_before_first_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = sqlite().await;
    let state = StatsState::new(
        config(),
        Arc::new(store),
        Arc::new(JsonStatsRepository::new(dir.path().join("stats.json"))),
        Arc::new(Metrics::default()),
    );
    let router = build_stats_router(state);
    let response = send(&router, get("/stats")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

async fn sqlite() -> SqliteEventStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("memory db");
    let store = SqliteEventStore::from_pool(pool);
    store.ensure_schema().await.expect("schema");
    store
}

#[tokio::test]
async fn store_service_serves_ranges() {
    let store = sqlite().await;
    store
        .insert_player_event(&PlayerActivity {
            player_id: "player-7".to_string(),
            server_id: "eu-1".to_string(),
            action: "join".to_string(),
            score: 11,
            timestamp: chrono::Utc::now(),
            trace_id: "trace-1".to_string(),
        })
        .await
        .expect("insert");
    let state = StoreState {
        config: config(),
        event_log: Arc::new(InMemoryEventLog::new()),
        event_repo: Arc::new(store),
        metrics: Arc::new(Metrics::default()),
    };
    let router = build_store_router(state);

    let response = send(
        &router,
        get("/player-events?start_timestamp=2000-01-01T00:00:00Z&end_timestamp=2999-01-01T00:00:00Z"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let rows = json_body(response).await;
    assert_eq!(rows[0]["trace_id"], "trace-1");
    assert!(rows[0]["date_created"].is_string());
    assert!(rows[0]["id"].is_i64());

    let response = send(&router, get("/server-events?start_timestamp=2000-01-01T00:00:00Z")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn every_service_exposes_ops_endpoints() {
    let log = InMemoryEventLog::new();
    let router = build_ingress_router(log_state(&log));
    send(&router, post_json("/player-event", &player_body(1))).await;

    assert_eq!(send(&router, get("/health/live")).await.status(), StatusCode::OK);
    assert_eq!(send(&router, get("/health/ready")).await.status(), StatusCode::OK);

    let response = send(&router, get("/metrics")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let text = String::from_utf8(bytes.to_vec()).expect("utf8");
    assert!(text.contains("telemetry_published_events_total 1"));
}

struct DownLog;

#[async_trait::async_trait]
impl EventLog for DownLog {
    async fn append(&self, _payload: &[u8]) -> anyhow::Result<String> {
        Err(anyhow::anyhow!("connection refused"))
    }

    async fn subscribe(
        &self,
        _group: &telemetry_domain::ports::ConsumerGroup,
    ) -> anyhow::Result<Box<dyn telemetry_domain::ports::LogSubscription>> {
        Err(anyhow::anyhow!("connection refused"))
    }

    async fn replay(&self) -> anyhow::Result<Box<dyn telemetry_domain::ports::LogReader>> {
        Err(anyhow::anyhow!("connection refused"))
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("connection refused"))
    }
}

#[tokio::test]
async fn unreachable_log_surfaces_as_server_error() {
    let state = LogState {
        config: config(),
        event_log: Arc::new(DownLog),
        metrics: Arc::new(Metrics::default()),
    };
    let ingress = build_ingress_router(state.clone());
    let response = send(&ingress, post_json("/player-event", &player_body(1))).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        send(&ingress, get("/health/ready")).await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );

    let query = build_query_router(state);
    let response = send(&query, get("/event-stats")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
