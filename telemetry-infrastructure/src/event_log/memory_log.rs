use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use telemetry_domain::ports::{ConsumerGroup, EventLog, LogReader, LogRecord, LogSubscription};
use telemetry_domain::StartPosition;

#[derive(Default)]
struct LogData {
    records: Vec<Vec<u8>>,
    /// Next offset to deliver per consumer group.
    committed: HashMap<String, usize>,
}

#[derive(Default)]
struct Shared {
    data: Mutex<LogData>,
    appended: Notify,
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, LogData>> {
        self.data.lock().map_err(|_| anyhow!("in-memory log lock poisoned"))
    }

    fn record_at(&self, offset: usize) -> Result<Option<LogRecord>> {
        Ok(self.lock()?.records.get(offset).map(|payload| LogRecord {
            position: offset.to_string(),
            payload: payload.clone(),
        }))
    }

    /// Waits for the record at `offset` until `deadline`.
    async fn wait_for(&self, offset: usize, deadline: Instant) -> Result<Option<LogRecord>> {
        loop {
            let notified = self.appended.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if let Some(record) = self.record_at(offset)? {
                return Ok(Some(record));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }
}

/// Process-local log. Positions are zero-based offsets.
#[derive(Clone, Default)]
pub struct InMemoryEventLog {
    shared: Arc<Shared>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.shared.lock().map(|data| data.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn committed_offset(&self, group: &str) -> Option<usize> {
        self.shared
            .lock()
            .ok()
            .and_then(|data| data.committed.get(group).copied())
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, payload: &[u8]) -> Result<String> {
        let position = {
            let mut data = self.shared.lock()?;
            data.records.push(payload.to_vec());
            data.records.len() - 1
        };
        self.shared.appended.notify_waiters();
        Ok(position.to_string())
    }

    async fn subscribe(&self, group: &ConsumerGroup) -> Result<Box<dyn LogSubscription>> {
        let cursor = {
            let mut data = self.shared.lock()?;
            let start = match group.start {
                StartPosition::Earliest => 0,
                StartPosition::Latest => data.records.len(),
            };
            *data.committed.entry(group.group.clone()).or_insert(start)
        };
        Ok(Box::new(MemorySubscription {
            shared: self.shared.clone(),
            group: group.group.clone(),
            cursor,
        }))
    }

    async fn replay(&self) -> Result<Box<dyn LogReader>> {
        Ok(Box::new(MemoryReader {
            shared: self.shared.clone(),
            cursor: 0,
        }))
    }

    async fn ping(&self) -> Result<()> {
        self.shared.lock().map(|_| ())
    }
}

struct MemorySubscription {
    shared: Arc<Shared>,
    group: String,
    cursor: usize,
}

#[async_trait]
impl LogSubscription for MemorySubscription {
    async fn next(&mut self, idle: Duration) -> Result<Option<LogRecord>> {
        let record = self
            .shared
            .wait_for(self.cursor, Instant::now() + idle)
            .await?;
        if record.is_some() {
            self.cursor += 1;
        }
        Ok(record)
    }

    async fn commit(&mut self, record: &LogRecord) -> Result<()> {
        let offset: usize = record
            .position
            .parse()
            .map_err(|_| anyhow!("invalid position '{}'", record.position))?;
        let mut data = self.shared.lock()?;
        let committed = data.committed.entry(self.group.clone()).or_insert(0);
        *committed = (*committed).max(offset + 1);
        Ok(())
    }

    async fn rewind(&mut self) -> Result<()> {
        let data = self.shared.lock()?;
        self.cursor = data.committed.get(&self.group).copied().unwrap_or(0);
        Ok(())
    }
}

struct MemoryReader {
    shared: Arc<Shared>,
    cursor: usize,
}

#[async_trait]
impl LogReader for MemoryReader {
    async fn next(&mut self, idle: Duration) -> Result<Option<LogRecord>> {
        let record = self
            .shared
            .wait_for(self.cursor, Instant::now() + idle)
            .await?;
        if record.is_some() {
            self.cursor += 1;
        }
        Ok(record)
    }
}
