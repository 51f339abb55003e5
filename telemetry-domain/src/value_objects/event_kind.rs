// Event kind value objects

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Discriminator carried in the `type` field of every envelope on the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PlayerEvent,
    ServerEvent,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PlayerEvent => "player_event",
            EventKind::ServerEvent => "server_event",
        }
    }

    pub fn anomaly_type(&self) -> AnomalyEventType {
        match self {
            EventKind::PlayerEvent => AnomalyEventType::PlayerActivityEvent,
            EventKind::ServerEvent => AnomalyEventType::ServerPerformanceEvent,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event type names used by anomaly records and the `event_type` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnomalyEventType {
    PlayerActivityEvent,
    ServerPerformanceEvent,
}

impl AnomalyEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyEventType::PlayerActivityEvent => "PlayerActivityEvent",
            AnomalyEventType::ServerPerformanceEvent => "ServerPerformanceEvent",
        }
    }
}

impl fmt::Display for AnomalyEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnomalyEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "PlayerActivityEvent" => Ok(AnomalyEventType::PlayerActivityEvent),
            "ServerPerformanceEvent" => Ok(AnomalyEventType::ServerPerformanceEvent),
            other => Err(format!(
                "invalid event_type '{}', expected PlayerActivityEvent or ServerPerformanceEvent",
                other
            )),
        }
    }
}
