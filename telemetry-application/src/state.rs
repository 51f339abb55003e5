use std::sync::Arc;

use async_trait::async_trait;
use telemetry_domain::ports::{
    AnomalyRepository, EventLog, EventRangeSource, EventRepository, StatsRepository,
};
use telemetry_domain::services::{AnomalyDetector, Thresholds};
use telemetry_domain::RuntimeConfig;
use tokio::sync::Mutex;

use crate::Metrics;

/// Common surface the operational handlers need from every service state.
#[async_trait]
pub trait ServiceState: Clone + Send + Sync + 'static {
    fn config(&self) -> &RuntimeConfig;
    fn metrics(&self) -> &Metrics;

    /// Pings the upstreams this service cannot work without.
    async fn check_ready(&self) -> anyhow::Result<()>;
}

/// Ingress and query services: talk to the log only.
#[derive(Clone)]
pub struct LogState {
    pub config: RuntimeConfig,
    pub event_log: Arc<dyn EventLog>,
    pub metrics: Arc<Metrics>,
}

/// Store service: durable writer plus range reads.
#[derive(Clone)]
pub struct StoreState {
    pub config: RuntimeConfig,
    pub event_log: Arc<dyn EventLog>,
    pub event_repo: Arc<dyn EventRepository>,
    pub metrics: Arc<Metrics>,
}

#[derive(Clone)]
pub struct StatsState {
    pub config: RuntimeConfig,
    pub event_source: Arc<dyn EventRangeSource>,
    pub stats_repo: Arc<dyn StatsRepository>,
    /// Held for the duration of one aggregation run; runs never overlap.
    pub run_guard: Arc<Mutex<()>>,
    pub metrics: Arc<Metrics>,
}

#[derive(Clone)]
pub struct AnomalyState {
    pub config: RuntimeConfig,
    pub event_log: Arc<dyn EventLog>,
    pub anomaly_repo: Arc<dyn AnomalyRepository>,
    pub detector: AnomalyDetector,
    pub run_lock: Arc<Mutex<()>>,
    pub metrics: Arc<Metrics>,
}

impl StatsState {
    pub fn new(
        config: RuntimeConfig,
        event_source: Arc<dyn EventRangeSource>,
        stats_repo: Arc<dyn StatsRepository>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config,
            event_source,
            stats_repo,
            run_guard: Arc::new(Mutex::new(())),
            metrics,
        }
    }
}

impl AnomalyState {
    pub fn new(
        config: RuntimeConfig,
        event_log: Arc<dyn EventLog>,
        anomaly_repo: Arc<dyn AnomalyRepository>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let detector = AnomalyDetector::new(Thresholds {
            score_max: config.score_max,
            cpu_max: config.cpu_max,
        });
        Self {
            config,
            event_log,
            anomaly_repo,
            detector,
            run_lock: Arc::new(Mutex::new(())),
            metrics,
        }
    }
}

#[async_trait]
impl ServiceState for LogState {
    fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    async fn check_ready(&self) -> anyhow::Result<()> {
        self.event_log.ping().await
    }
}

#[async_trait]
impl ServiceState for StoreState {
    fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    async fn check_ready(&self) -> anyhow::Result<()> {
        self.event_repo.ping().await?;
        self.event_log.ping().await
    }
}

#[async_trait]
impl ServiceState for StatsState {
    fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    async fn check_ready(&self) -> anyhow::Result<()> {
        self.event_source.ping().await
    }
}

#[async_trait]
impl ServiceState for AnomalyState {
    fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    async fn check_ready(&self) -> anyhow::Result<()> {
        self.event_log.ping().await
    }
}
