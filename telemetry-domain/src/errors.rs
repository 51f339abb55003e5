// Domain error kinds that callers branch on

use thiserror::Error;

use crate::value_objects::EventKind;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("invalid {kind} payload: {source}")]
    Payload {
        kind: EventKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("envelope payload must be a JSON object")]
    PayloadNotObject,
    #[error("failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Outcome of a failed insert into the relational store.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("duplicate natural key for trace_id {trace_id}")]
    Duplicate { trace_id: String },
    #[error("transient persistence failure: {0}")]
    Transient(#[from] anyhow::Error),
}
