use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use telemetry_application::{AnomalyState, LogState, Metrics, StatsState, StoreState};
use telemetry_domain::ports::{EventLog, EventRangeSource, EventRepository};
use telemetry_domain::RuntimeConfig;
use telemetry_infrastructure::{
    AppConfig, InMemoryEventLog, JsonAnomalyRepository, JsonStatsRepository, RedisEventLog,
    SqliteEventStore, StoreServiceClient,
};

/// Configuration plus lazily built, shared adapters for one process.
pub struct AppContext {
    pub config: AppConfig,
    pub runtime: RuntimeConfig,
    pub metrics: Arc<Metrics>,
    event_log: Option<Arc<dyn EventLog>>,
    event_store: Option<Arc<SqliteEventStore>>,
}

impl AppContext {
    pub async fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = AppConfig::load(config_path).await?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: AppConfig) -> Self {
        let runtime = config.to_runtime_config();
        Self {
            config,
            runtime,
            metrics: Arc::new(Metrics::default()),
            event_log: None,
            event_store: None,
        }
    }

    /// Connects the configured log once; an unreachable broker is fatal.
    pub async fn event_log(&mut self) -> Result<Arc<dyn EventLog>> {
        if let Some(log) = &self.event_log {
            return Ok(log.clone());
        }
        let broker = self.config.to_broker_config();
        let log: Arc<dyn EventLog> = match broker.backend.as_str() {
            "memory" => Arc::new(InMemoryEventLog::new()),
            _ => Arc::new(RedisEventLog::new(&broker)?),
        };
        log.ping()
            .await
            .with_context(|| format!("event log {}:{} unreachable", broker.host, broker.port))?;
        info!(backend = %broker.backend, topic = %broker.topic, "event log ready");
        self.event_log = Some(log.clone());
        Ok(log)
    }

    pub async fn event_store(&mut self) -> Result<Arc<SqliteEventStore>> {
        if let Some(store) = &self.event_store {
            return Ok(store.clone());
        }
        let store = Arc::new(SqliteEventStore::connect(&self.config.to_db_config()).await?);
        store.ensure_schema().await?;
        self.event_store = Some(store.clone());
        Ok(store)
    }

    pub async fn log_state(&mut self) -> Result<LogState> {
        Ok(LogState {
            config: self.runtime.clone(),
            event_log: self.event_log().await?,
            metrics: self.metrics.clone(),
        })
    }

    pub async fn store_state(&mut self) -> Result<StoreState> {
        Ok(StoreState {
            config: self.runtime.clone(),
            event_log: self.event_log().await?,
            event_repo: self.event_store().await?,
            metrics: self.metrics.clone(),
        })
    }

    /// With `direct_store` the aggregator reads the database itself;
    /// otherwise it goes through the store service over HTTP.
    pub async fn stats_state(&mut self, direct_store: bool) -> Result<StatsState> {
        let event_source: Arc<dyn EventRangeSource> = if direct_store {
            self.event_store().await?
        } else {
            Arc::new(StoreServiceClient::new(
                &self.config.store_url,
                Duration::from_secs(self.runtime.request_timeout_seconds),
            )?)
        };
        Ok(StatsState::new(
            self.runtime.clone(),
            event_source,
            Arc::new(JsonStatsRepository::new(&self.config.stats_path)),
            self.metrics.clone(),
        ))
    }

    pub async fn anomaly_state(&mut self) -> Result<AnomalyState> {
        Ok(AnomalyState::new(
            self.runtime.clone(),
            self.event_log().await?,
            Arc::new(JsonAnomalyRepository::new(&self.config.anomaly_path)),
            self.metrics.clone(),
        ))
    }
}
