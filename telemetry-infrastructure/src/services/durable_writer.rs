use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{error, info, warn};

use telemetry_application::commands::persist_record;
use telemetry_application::StoreState;
use telemetry_domain::ports::ConsumerGroup;

fn consumer_group(state: &StoreState) -> ConsumerGroup {
    ConsumerGroup {
        group: state.config.consumer_group.clone(),
        consumer: state.config.consumer_name.clone(),
        start: state.config.log_start,
    }
}

/// Sleeps for `duration` unless shutdown is signalled first. Returns `true`
/// when shutting down.
async fn backoff(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => *shutdown.borrow(),
        _ = shutdown.changed() => true,
    }
}

/// Consumes the log into the relational store until shutdown. The group's
/// offset only moves past a record once it is stored, known duplicate, or
/// poison; a transient failure rewinds so the record is redelivered.
pub async fn run_durable_writer(state: StoreState, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    let group = consumer_group(&state);
    let idle = Duration::from_millis(state.config.log_idle_timeout_ms);
    let retry_backoff = Duration::from_millis(state.config.writer_retry_backoff_ms);

    let mut subscription = loop {
        match state.event_log.subscribe(&group).await {
            Ok(subscription) => break subscription,
            Err(err) => {
                error!(group = %group.group, "failed to join consumer group: {}", err);
                if backoff(retry_backoff, &mut shutdown).await {
                    return Ok(());
                }
            }
        }
    };
    info!(
        group = %group.group,
        consumer = %group.consumer,
        "durable writer subscribed"
    );

    loop {
        if *shutdown.borrow() {
            break;
        }
        let polled = tokio::select! {
            polled = subscription.next(idle) => polled,
            _ = shutdown.changed() => break,
        };
        let record = match polled {
            Ok(Some(record)) => record,
            Ok(None) => continue,
            Err(err) => {
                warn!("failed to poll log: {}", err);
                if backoff(retry_backoff, &mut shutdown).await {
                    break;
                }
                continue;
            }
        };

        let outcome = persist_record(&state, &record).await;
        if outcome.should_commit() {
            if let Err(err) = subscription.commit(&record).await {
                // Uncommitted records come back and dedup on trace_id.
                warn!(position = %record.position, "failed to commit offset: {}", err);
            }
            continue;
        }

        if let Err(err) = subscription.rewind().await {
            warn!("failed to rewind subscription: {}", err);
        }
        if backoff(retry_backoff, &mut shutdown).await {
            break;
        }
    }

    info!("durable writer stopped");
    Ok(())
}
