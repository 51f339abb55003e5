use std::time::Duration;

use async_trait::async_trait;

use crate::value_objects::StartPosition;

/// One message read from the log. `position` is opaque and ordered per topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub position: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerGroup {
    pub group: String,
    pub consumer: String,
    pub start: StartPosition,
}

/// Append-only, replayable, ordered log of byte messages for one topic.
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn append(&self, payload: &[u8]) -> anyhow::Result<String>;

    /// Joins (or creates) a consumer group. A new group starts at
    /// `group.start`; an existing one resumes after its committed offset.
    async fn subscribe(&self, group: &ConsumerGroup) -> anyhow::Result<Box<dyn LogSubscription>>;

    /// Independent reader positioned at the earliest retained record.
    async fn replay(&self) -> anyhow::Result<Box<dyn LogReader>>;

    async fn ping(&self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait LogSubscription: Send {
    /// Waits up to `idle` for the next record; `None` means nothing arrived.
    async fn next(&mut self, idle: Duration) -> anyhow::Result<Option<LogRecord>>;

    /// Marks `record` and everything before it as handled for the group.
    async fn commit(&mut self, record: &LogRecord) -> anyhow::Result<()>;

    /// Moves the read cursor back to the group's committed offset so
    /// uncommitted records are delivered again.
    async fn rewind(&mut self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait LogReader: Send {
    /// `None` once no record arrives within `idle` (end-of-stream heuristic).
    async fn next(&mut self, idle: Duration) -> anyhow::Result<Option<LogRecord>>;
}
