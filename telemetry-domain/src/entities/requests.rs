// Inbound request DTOs
// Bodies accepted by the ingress endpoints before a trace id is assigned

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::entities::{PlayerActivity, ServerPerformance, TelemetryEvent};
use crate::utils::lenient_timestamp;
use crate::value_objects::EventKind;

const MAX_ID_LEN: usize = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerActivityRequest {
    pub player_id: String,
    pub server_id: String,
    pub action: String,
    pub score: i64,
    #[serde(with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerPerformanceRequest {
    pub server_id: String,
    pub uptime: i64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    #[serde(with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum InboundEvent {
    Player(PlayerActivityRequest),
    Server(ServerPerformanceRequest),
}

impl InboundEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            InboundEvent::Player(_) => EventKind::PlayerEvent,
            InboundEvent::Server(_) => EventKind::ServerEvent,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            InboundEvent::Player(body) => {
                require_id("player_id", &body.player_id)?;
                require_id("server_id", &body.server_id)?;
                require_id("action", &body.action)?;
                Ok(())
            }
            InboundEvent::Server(body) => {
                require_id("server_id", &body.server_id)?;
                if body.uptime < 0 {
                    return Err("uptime must not be negative".to_string());
                }
                require_measure("cpu_usage", body.cpu_usage)?;
                require_measure("memory_usage", body.memory_usage)?;
                Ok(())
            }
        }
    }

    pub fn into_event(self, trace_id: String) -> TelemetryEvent {
        match self {
            InboundEvent::Player(body) => TelemetryEvent::Player(PlayerActivity {
                player_id: body.player_id.trim().to_string(),
                server_id: body.server_id.trim().to_string(),
                action: body.action.trim().to_string(),
                score: body.score,
                timestamp: body.timestamp,
                trace_id,
            }),
            InboundEvent::Server(body) => TelemetryEvent::Server(ServerPerformance {
                server_id: body.server_id.trim().to_string(),
                uptime: body.uptime,
                cpu_usage: body.cpu_usage,
                memory_usage: body.memory_usage,
                timestamp: body.timestamp,
                trace_id,
            }),
        }
    }
}

fn require_id(field: &str, value: &str) -> Result<(), String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{} is required", field));
    }
    if trimmed.chars().count() > MAX_ID_LEN {
        return Err(format!("{} exceeds {} characters", field, MAX_ID_LEN));
    }
    Ok(())
}

fn require_measure(field: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{} must be a finite non-negative number", field));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexQuery {
    pub index: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeRangeQuery {
    pub start_timestamp: Option<String>,
    pub end_timestamp: Option<String>,
}
