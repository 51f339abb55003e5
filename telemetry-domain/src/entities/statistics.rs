// Running statistics entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventStatistics {
    pub total_player_events: u64,
    pub total_server_events: u64,
    pub max_player_score: i64,
    pub avg_cpu_usage: f64,
    /// Watermark: everything with `date_created` before this is counted.
    pub last_updated: DateTime<Utc>,
}

impl Default for EventStatistics {
    fn default() -> Self {
        Self {
            total_player_events: 0,
            total_server_events: 0,
            max_player_score: 0,
            avg_cpu_usage: 0.0,
            last_updated: DateTime::<Utc>::default(),
        }
    }
}
