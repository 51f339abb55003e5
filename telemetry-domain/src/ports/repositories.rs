use async_trait::async_trait;

use crate::entities::{
    AnomalyRecord, EventStatistics, PlayerActivity, PlayerEvent, ServerEvent, ServerPerformance,
    TimeRange,
};
use crate::errors::PersistError;

/// Range reads over persisted events by `date_created`.
#[async_trait]
pub trait EventRangeSource: Send + Sync {
    async fn fetch_player_events(&self, range: TimeRange) -> anyhow::Result<Vec<PlayerEvent>>;
    async fn fetch_server_events(&self, range: TimeRange) -> anyhow::Result<Vec<ServerEvent>>;
    async fn ping(&self) -> anyhow::Result<()>;
}

/// Relational store of persisted events; each insert is one transaction and
/// `trace_id` is unique per table.
#[async_trait]
pub trait EventRepository: EventRangeSource {
    async fn ensure_schema(&self) -> anyhow::Result<()>;
    async fn insert_player_event(&self, event: &PlayerActivity) -> Result<PlayerEvent, PersistError>;
    async fn insert_server_event(&self, event: &ServerPerformance) -> Result<ServerEvent, PersistError>;
}

/// Singleton statistics record.
#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn load(&self) -> anyhow::Result<Option<EventStatistics>>;
    /// Persists aggregate and watermark in a single write.
    async fn save(&self, stats: &EventStatistics) -> anyhow::Result<()>;
}

/// Anomaly snapshot, replaced wholesale on every detection run.
#[async_trait]
pub trait AnomalyRepository: Send + Sync {
    async fn load_snapshot(&self) -> anyhow::Result<Option<Vec<AnomalyRecord>>>;
    async fn replace_snapshot(&self, anomalies: &[AnomalyRecord]) -> anyhow::Result<()>;
}
