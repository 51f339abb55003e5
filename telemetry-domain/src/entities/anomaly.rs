// Anomaly entity
// One threshold violation found by a detection run; the full set is a snapshot

use serde::{Deserialize, Serialize};

use crate::value_objects::AnomalyEventType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    /// Log position of the offending envelope.
    pub id: String,
    pub trace_id: String,
    pub event_type: AnomalyEventType,
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnomalyQuery {
    pub event_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyUpdateSummary {
    pub anomalies_count: usize,
}
