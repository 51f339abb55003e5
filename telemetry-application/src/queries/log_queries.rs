use std::time::Duration;

use tracing::{info, warn};

use crate::{AppError, LogState};
use telemetry_domain::ports::LogReader;
use telemetry_domain::{EventEnvelope, EventKind, LogEventCounts};

async fn open_reader(state: &LogState) -> Result<Box<dyn LogReader>, AppError> {
    state.event_log.replay().await.map_err(|err| {
        warn!("failed to open log reader: {}", err);
        AppError::Unavailable(err)
    })
}

/// Returns the `index`-th (zero-based) envelope of `kind` in log order.
/// Other kinds and unreadable messages do not advance the count.
pub async fn find_event(
    state: &LogState,
    kind: EventKind,
    index: u64,
) -> Result<EventEnvelope, AppError> {
    let idle = Duration::from_millis(state.config.log_idle_timeout_ms);
    let mut reader = open_reader(state).await?;
    let mut seen = 0u64;

    while let Some(record) = reader.next(idle).await.map_err(AppError::Unavailable)? {
        let envelope = match EventEnvelope::decode(&record.payload) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(position = %record.position, "skipping unreadable log message: {}", err);
                continue;
            }
        };
        if envelope.kind != kind {
            continue;
        }
        if seen == index {
            info!(position = %record.position, "found {} at index {}", kind, index);
            return Ok(envelope);
        }
        seen += 1;
    }

    warn!("no {} found at index {}", kind, index);
    Err(AppError::NotFound(format!("no {} at index {}", kind, index)))
}

pub async fn count_events(state: &LogState) -> Result<LogEventCounts, AppError> {
    let idle = Duration::from_millis(state.config.log_idle_timeout_ms);
    let mut reader = open_reader(state).await?;
    let mut counts = LogEventCounts::default();

    while let Some(record) = reader.next(idle).await.map_err(AppError::Unavailable)? {
        match EventEnvelope::decode(&record.payload).map(|envelope| envelope.kind) {
            Ok(EventKind::PlayerEvent) => counts.num_player_events += 1,
            Ok(EventKind::ServerEvent) => counts.num_server_events += 1,
            Err(err) => warn!(position = %record.position, "skipping unreadable log message: {}", err),
        }
    }
    Ok(counts)
}
