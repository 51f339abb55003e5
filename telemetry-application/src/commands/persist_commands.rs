use tracing::{error, info, warn};

use crate::StoreState;
use telemetry_domain::ports::LogRecord;
use telemetry_domain::{EventEnvelope, PersistError, TelemetryEvent};

/// What the durable writer should do with the log record it just handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Stored,
    /// `trace_id` already present; the earlier row wins.
    Duplicate,
    /// Undecodable or unknown envelope; never retried.
    Poisoned,
    /// Store failed; the record must be delivered again.
    Transient,
}

impl PersistOutcome {
    pub fn should_commit(&self) -> bool {
        !matches!(self, PersistOutcome::Transient)
    }
}

pub async fn persist_record(state: &StoreState, record: &LogRecord) -> PersistOutcome {
    let event = match EventEnvelope::decode(&record.payload).and_then(|envelope| envelope.event()) {
        Ok(event) => event,
        Err(err) => {
            state.metrics.record_poison();
            warn!(position = %record.position, "skipping unreadable log message: {}", err);
            return PersistOutcome::Poisoned;
        }
    };

    let inserted = match &event {
        TelemetryEvent::Player(player) => state
            .event_repo
            .insert_player_event(player)
            .await
            .map(|row| row.id),
        TelemetryEvent::Server(server) => state
            .event_repo
            .insert_server_event(server)
            .await
            .map(|row| row.id),
    };

    match inserted {
        Ok(id) => {
            state.metrics.record_persisted();
            info!(
                position = %record.position,
                trace_id = %event.trace_id(),
                "stored {} as row {}",
                event.kind(),
                id
            );
            PersistOutcome::Stored
        }
        Err(PersistError::Duplicate { trace_id }) => {
            state.metrics.record_duplicate();
            warn!(position = %record.position, trace_id = %trace_id, "duplicate event ignored");
            PersistOutcome::Duplicate
        }
        Err(PersistError::Transient(err)) => {
            state.metrics.record_transient_failure();
            error!(
                position = %record.position,
                trace_id = %event.trace_id(),
                "failed to store event: {}",
                err
            );
            PersistOutcome::Transient
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_failures_hold_the_offset() {
        assert!(PersistOutcome::Stored.should_commit());
        assert!(PersistOutcome::Duplicate.should_commit());
        assert!(PersistOutcome::Poisoned.should_commit());
        assert!(!PersistOutcome::Transient.should_commit());
    }
}
