use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::{AnomalyState, AppError};
use telemetry_domain::{AnomalyUpdateSummary, EventEnvelope};

/// Replays the whole log, evaluates every event and replaces the snapshot.
/// Concurrent calls queue behind `run_lock`.
pub async fn update_anomalies(state: &AnomalyState) -> Result<AnomalyUpdateSummary, AppError> {
    let _serialized = state.run_lock.lock().await;
    let idle = Duration::from_millis(state.config.log_idle_timeout_ms);

    let mut reader = state.event_log.replay().await.map_err(|err| {
        error!("failed to open log reader: {}", err);
        AppError::Unavailable(err)
    })?;

    let mut anomalies = Vec::new();
    let mut scanned = 0usize;
    while let Some(record) = reader.next(idle).await.map_err(|err| {
        error!("failed to read log: {}", err);
        AppError::Unavailable(err)
    })? {
        scanned += 1;
        let event = match EventEnvelope::decode(&record.payload).and_then(|envelope| envelope.event()) {
            Ok(event) => event,
            Err(err) => {
                warn!(position = %record.position, "skipping unreadable log message: {}", err);
                continue;
            }
        };
        if let Some(anomaly) = state.detector.evaluate(&record.position, &event) {
            debug!(trace_id = %anomaly.trace_id, "{}", anomaly.description);
            anomalies.push(anomaly);
        }
    }
    info!(scanned, "retrieved events from log");

    state
        .anomaly_repo
        .replace_snapshot(&anomalies)
        .await
        .map_err(|err| {
            error!("failed to write anomaly snapshot: {}", err);
            AppError::Internal(err)
        })?;
    state.metrics.record_anomalies(anomalies.len());
    info!(anomalies = anomalies.len(), "anomaly detection completed");

    Ok(AnomalyUpdateSummary {
        anomalies_count: anomalies.len(),
    })
}
