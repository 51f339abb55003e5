// In-crate fakes for use-case tests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use telemetry_domain::ports::{
    AnomalyRepository, ConsumerGroup, EventLog, LogReader, LogRecord, LogSubscription,
};
use telemetry_domain::{
    AnomalyRecord, EventEnvelope, PlayerActivity, RuntimeConfig, ServerPerformance,
    TelemetryEvent,
};

use crate::{AnomalyState, LogState, Metrics};

/// Fixed log contents; `append` records payloads without making them readable.
#[derive(Default)]
pub struct StaticLog {
    records: Vec<LogRecord>,
    fail_append: bool,
    appended: Mutex<Vec<Vec<u8>>>,
}

impl StaticLog {
    pub fn with_payloads(payloads: Vec<Vec<u8>>) -> Self {
        let records = payloads
            .into_iter()
            .enumerate()
            .map(|(idx, payload)| LogRecord {
                position: idx.to_string(),
                payload,
            })
            .collect();
        Self {
            records,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_append: true,
            ..Self::default()
        }
    }

    pub fn appended(&self) -> Vec<Vec<u8>> {
        self.appended.lock().map(|guard| guard.clone()).unwrap_or_default()
    }
}

struct StaticReader {
    records: std::vec::IntoIter<LogRecord>,
}

#[async_trait]
impl LogReader for StaticReader {
    async fn next(&mut self, _idle: Duration) -> Result<Option<LogRecord>> {
        Ok(self.records.next())
    }
}

#[async_trait]
impl EventLog for StaticLog {
    async fn append(&self, payload: &[u8]) -> Result<String> {
        if self.fail_append {
            return Err(anyhow!("connection refused"));
        }
        let mut appended = self.appended.lock().map_err(|_| anyhow!("poisoned"))?;
        appended.push(payload.to_vec());
        Ok((appended.len() - 1).to_string())
    }

    async fn subscribe(&self, _group: &ConsumerGroup) -> Result<Box<dyn LogSubscription>> {
        Err(anyhow!("subscriptions are not supported by the static log"))
    }

    async fn replay(&self) -> Result<Box<dyn LogReader>> {
        Ok(Box::new(StaticReader {
            records: self.records.clone().into_iter(),
        }))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryAnomalies {
    snapshot: Mutex<Option<Vec<AnomalyRecord>>>,
}

#[async_trait]
impl AnomalyRepository for MemoryAnomalies {
    async fn load_snapshot(&self) -> Result<Option<Vec<AnomalyRecord>>> {
        Ok(self.snapshot.lock().map_err(|_| anyhow!("poisoned"))?.clone())
    }

    async fn replace_snapshot(&self, anomalies: &[AnomalyRecord]) -> Result<()> {
        *self.snapshot.lock().map_err(|_| anyhow!("poisoned"))? = Some(anomalies.to_vec());
        Ok(())
    }
}

pub fn log_state(log: Arc<dyn EventLog>) -> LogState {
    LogState {
        config: RuntimeConfig::default(),
        event_log: log,
        metrics: Arc::new(Metrics::default()),
    }
}

pub fn anomaly_state(log: Arc<dyn EventLog>, repo: Arc<dyn AnomalyRepository>) -> AnomalyState {
    AnomalyState::new(
        RuntimeConfig::default(),
        log,
        repo,
        Arc::new(Metrics::default()),
    )
}

pub fn player(trace_id: &str, score: i64) -> TelemetryEvent {
    TelemetryEvent::Player(PlayerActivity {
        player_id: "p-1".to_string(),
        server_id: "s-1".to_string(),
        action: "score".to_string(),
        score,
        timestamp: Utc::now(),
        trace_id: trace_id.to_string(),
    })
}

pub fn server(trace_id: &str, cpu_usage: f64) -> TelemetryEvent {
    TelemetryEvent::Server(ServerPerformance {
        server_id: "s-1".to_string(),
        uptime: 100,
        cpu_usage,
        memory_usage: 512.0,
        timestamp: Utc::now(),
        trace_id: trace_id.to_string(),
    })
}

pub fn envelope_bytes(event: &TelemetryEvent) -> Vec<u8> {
    EventEnvelope::wrap(event, Utc::now())
        .and_then(|envelope| envelope.encode())
        .expect("encode envelope")
}
