// Envelope entity
// The typed wrapper appended to the event log, one per inbound event

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entities::{PlayerActivity, ServerPerformance, TelemetryEvent};
use crate::errors::EnvelopeError;
use crate::utils::lenient_timestamp;
use crate::value_objects::EventKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(with = "lenient_timestamp")]
    pub datetime: DateTime<Utc>,
    pub payload: Map<String, Value>,
}

impl EventEnvelope {
    pub fn wrap(event: &TelemetryEvent, datetime: DateTime<Utc>) -> Result<Self, EnvelopeError> {
        let value = match event {
            TelemetryEvent::Player(payload) => serde_json::to_value(payload),
            TelemetryEvent::Server(payload) => serde_json::to_value(payload),
        }
        .map_err(EnvelopeError::Encode)?;
        let Value::Object(payload) = value else {
            return Err(EnvelopeError::PayloadNotObject);
        };
        Ok(Self {
            kind: event.kind(),
            datetime,
            payload,
        })
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        serde_json::from_slice(bytes).map_err(EnvelopeError::Malformed)
    }

    pub fn encode(&self) -> Result<Vec<u8>, EnvelopeError> {
        serde_json::to_vec(self).map_err(EnvelopeError::Encode)
    }

    /// Interprets the payload according to the envelope's `type`.
    pub fn event(&self) -> Result<TelemetryEvent, EnvelopeError> {
        let payload = Value::Object(self.payload.clone());
        let event = match self.kind {
            EventKind::PlayerEvent => serde_json::from_value::<PlayerActivity>(payload)
                .map(TelemetryEvent::Player),
            EventKind::ServerEvent => serde_json::from_value::<ServerPerformance>(payload)
                .map(TelemetryEvent::Server),
        };
        event.map_err(|source| EnvelopeError::Payload {
            kind: self.kind,
            source,
        })
    }
}
