use crate::entities::{AnomalyRecord, TelemetryEvent};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub score_max: i64,
    pub cpu_max: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            score_max: 1_000_000,
            cpu_max: 90.0,
        }
    }
}

/// Stateless threshold rules. Both comparisons are strict: a value equal to
/// its threshold is not an anomaly.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnomalyDetector {
    thresholds: Thresholds,
}

impl AnomalyDetector {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn evaluate(&self, position: &str, event: &TelemetryEvent) -> Option<AnomalyRecord> {
        let description = match event {
            TelemetryEvent::Player(player) if player.score > self.thresholds.score_max => format!(
                "Score detected: {}; threshold: {}",
                player.score, self.thresholds.score_max
            ),
            TelemetryEvent::Server(server) if server.cpu_usage > self.thresholds.cpu_max => format!(
                "CPU usage detected: {}%; threshold: {}%",
                server.cpu_usage, self.thresholds.cpu_max
            ),
            _ => return None,
        };
        Some(AnomalyRecord {
            id: position.to_string(),
            trace_id: event.trace_id().to_string(),
            event_type: event.kind().anomaly_type(),
            description,
        })
    }
}
