// Event entities
// Telemetry payloads carried on the log and the rows persisted from them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::lenient_timestamp;
use crate::value_objects::EventKind;

/// Player activity payload as placed on the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerActivity {
    pub player_id: String,
    pub server_id: String,
    pub action: String,
    pub score: i64,
    #[serde(with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub trace_id: String,
}

/// Server performance payload as placed on the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerPerformance {
    pub server_id: String,
    pub uptime: i64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    #[serde(with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub trace_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    Player(PlayerActivity),
    Server(ServerPerformance),
}

impl TelemetryEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TelemetryEvent::Player(_) => EventKind::PlayerEvent,
            TelemetryEvent::Server(_) => EventKind::ServerEvent,
        }
    }

    pub fn trace_id(&self) -> &str {
        match self {
            TelemetryEvent::Player(event) => &event.trace_id,
            TelemetryEvent::Server(event) => &event.trace_id,
        }
    }
}

/// Persisted `player_events` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerEvent {
    pub id: i64,
    pub player_id: String,
    pub server_id: String,
    pub action: String,
    pub score: i64,
    #[serde(with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub trace_id: String,
    #[serde(with = "lenient_timestamp")]
    pub date_created: DateTime<Utc>,
}

/// Persisted `server_events` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEvent {
    pub id: i64,
    pub server_id: String,
    pub uptime: i64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    #[serde(with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub trace_id: String,
    #[serde(with = "lenient_timestamp")]
    pub date_created: DateTime<Utc>,
}

/// Half-open `[start, end)` window over `date_created`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Per-type totals observed while replaying the log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEventCounts {
    pub num_player_events: u64,
    pub num_server_events: u64,
}
