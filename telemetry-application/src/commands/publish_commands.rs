use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::{AppError, LogState};
use telemetry_domain::{EnvelopeError, EventEnvelope, InboundEvent};

/// Namespace for trace ids derived from client idempotency keys.
const IDEMPOTENCY_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_9b3d_4c58_a2e1_7d0f_5b9c_3e21);

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("event log unavailable: {0}")]
    BrokerUnavailable(#[source] anyhow::Error),
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

impl From<PublishError> for AppError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::BrokerUnavailable(source) => AppError::Unavailable(source),
            PublishError::Envelope(source) => AppError::Internal(source.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReceipt {
    pub trace_id: String,
    pub position: String,
}

/// The same key always maps to the same trace id, so a retried request
/// collapses onto one stored row.
pub fn trace_id_for(idempotency_key: Option<&str>) -> String {
    match idempotency_key.map(str::trim).filter(|key| !key.is_empty()) {
        Some(key) => Uuid::new_v5(&IDEMPOTENCY_NAMESPACE, key.as_bytes()).to_string(),
        None => Uuid::new_v4().to_string(),
    }
}

pub async fn publish_event(
    state: &LogState,
    inbound: InboundEvent,
    idempotency_key: Option<&str>,
) -> Result<PublishReceipt, PublishError> {
    let trace_id = trace_id_for(idempotency_key);
    let kind = inbound.kind();
    info!(trace_id = %trace_id, event_type = %kind, "received event");

    let event = inbound.into_event(trace_id.clone());
    let bytes = EventEnvelope::wrap(&event, Utc::now())?.encode()?;

    let position = state.event_log.append(&bytes).await.map_err(|err| {
        state.metrics.record_publish_error();
        error!(trace_id = %trace_id, "failed to append event to log: {}", err);
        PublishError::BrokerUnavailable(err)
    })?;

    state.metrics.record_published();
    info!(trace_id = %trace_id, position = %position, "produced {} to log", kind);
    Ok(PublishReceipt { trace_id, position })
}
