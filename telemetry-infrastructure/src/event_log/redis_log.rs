use std::collections::VecDeque;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use telemetry_domain::ports::{ConsumerGroup, EventLog, LogReader, LogRecord, LogSubscription};
use telemetry_domain::{BrokerConfig, StartPosition};

const DATA_FIELD: &str = "data";
const READ_BATCH: usize = 64;

/// Event log on a Redis stream; consumer groups carry committed offsets.
pub struct RedisEventLog {
    client: redis::Client,
    stream: String,
    producer: OnceCell<MultiplexedConnection>,
}

impl RedisEventLog {
    pub fn new(broker: &BrokerConfig) -> Result<Self> {
        let client = redis::Client::open(broker.redis_url())
            .with_context(|| format!("invalid broker address {}:{}", broker.host, broker.port))?;
        Ok(Self {
            client,
            stream: broker.topic.clone(),
            producer: OnceCell::new(),
        })
    }

    async fn producer(&self) -> Result<MultiplexedConnection> {
        let conn = self
            .producer
            .get_or_try_init(|| self.client.get_multiplexed_async_connection())
            .await?;
        Ok(conn.clone())
    }

    /// Blocking reads get their own connection so they never stall appends.
    async fn dedicated(&self) -> Result<MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl EventLog for RedisEventLog {
    async fn append(&self, payload: &[u8]) -> Result<String> {
        let mut conn = self.producer().await?;
        let id: String = conn
            .xadd(&self.stream, "*", &[(DATA_FIELD, payload)])
            .await?;
        Ok(id)
    }

    async fn subscribe(&self, group: &ConsumerGroup) -> Result<Box<dyn LogSubscription>> {
        let mut conn = self.dedicated().await?;
        let start_id = match group.start {
            StartPosition::Earliest => "0",
            StartPosition::Latest => "$",
        };
        let created: redis::RedisResult<()> = conn
            .xgroup_create_mkstream(&self.stream, &group.group, start_id)
            .await;
        match created {
            Ok(()) => info!(group = %group.group, stream = %self.stream, "created consumer group"),
            Err(err) if err.code() == Some("BUSYGROUP") => {
                debug!(group = %group.group, "consumer group already exists")
            }
            Err(err) => return Err(err.into()),
        }
        Ok(Box::new(RedisSubscription {
            conn,
            stream: self.stream.clone(),
            group: group.group.clone(),
            consumer: group.consumer.clone(),
            buffer: VecDeque::new(),
            pending_first: true,
        }))
    }

    async fn replay(&self) -> Result<Box<dyn LogReader>> {
        Ok(Box::new(RedisReader {
            conn: self.dedicated().await?,
            stream: self.stream.clone(),
            last_id: "0-0".to_string(),
            buffer: VecDeque::new(),
        }))
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.producer().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

fn block_millis(idle: Duration) -> usize {
    // BLOCK 0 waits forever.
    (idle.as_millis() as usize).max(1)
}

fn stream_records(reply: StreamReadReply) -> Vec<LogRecord> {
    reply
        .keys
        .into_iter()
        .flat_map(|key| key.ids)
        .filter_map(|entry| match entry.get::<Vec<u8>>(DATA_FIELD) {
            Some(payload) => Some(LogRecord {
                position: entry.id,
                payload,
            }),
            None => {
                warn!(position = %entry.id, "stream entry without data field");
                None
            }
        })
        .collect()
}

struct RedisSubscription {
    conn: MultiplexedConnection,
    stream: String,
    group: String,
    consumer: String,
    buffer: VecDeque<LogRecord>,
    /// Read this consumer's delivered-but-unacked entries before new ones.
    pending_first: bool,
}

impl RedisSubscription {
    async fn read_pending(&mut self) -> Result<()> {
        let options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(READ_BATCH);
        let reply: Option<StreamReadReply> = self
            .conn
            .xread_options(&[&self.stream], &["0"], &options)
            .await?;
        let records = reply.map(stream_records).unwrap_or_default();
        if records.is_empty() {
            self.pending_first = false;
        } else {
            debug!(count = records.len(), "redelivering pending entries");
            self.buffer.extend(records);
        }
        Ok(())
    }

    async fn read_new(&mut self, idle: Duration) -> Result<()> {
        let options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(READ_BATCH)
            .block(block_millis(idle));
        let reply: Option<StreamReadReply> = self
            .conn
            .xread_options(&[&self.stream], &[">"], &options)
            .await?;
        self.buffer.extend(reply.map(stream_records).unwrap_or_default());
        Ok(())
    }
}

#[async_trait]
impl LogSubscription for RedisSubscription {
    async fn next(&mut self, idle: Duration) -> Result<Option<LogRecord>> {
        if self.buffer.is_empty() && self.pending_first {
            self.read_pending().await?;
        }
        if self.buffer.is_empty() {
            self.read_new(idle).await?;
        }
        Ok(self.buffer.pop_front())
    }

    async fn commit(&mut self, record: &LogRecord) -> Result<()> {
        let _: i64 = self
            .conn
            .xack(&self.stream, &self.group, &[&record.position])
            .await?;
        Ok(())
    }

    async fn rewind(&mut self) -> Result<()> {
        self.buffer.clear();
        self.pending_first = true;
        Ok(())
    }
}

struct RedisReader {
    conn: MultiplexedConnection,
    stream: String,
    last_id: String,
    buffer: VecDeque<LogRecord>,
}

#[async_trait]
impl LogReader for RedisReader {
    async fn next(&mut self, idle: Duration) -> Result<Option<LogRecord>> {
        if self.buffer.is_empty() {
            let options = StreamReadOptions::default()
                .count(READ_BATCH)
                .block(block_millis(idle));
            let reply: Option<StreamReadReply> = self
                .conn
                .xread_options(&[&self.stream], &[&self.last_id], &options)
                .await?;
            let records = reply.map(stream_records).unwrap_or_default();
            if let Some(last) = records.last() {
                self.last_id = last.position.clone();
            }
            self.buffer.extend(records);
        }
        Ok(self.buffer.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redis::streams::{StreamId, StreamKey};
    use std::collections::HashMap;

    fn entry(id: &str, data: Option<&[u8]>) -> StreamId {
        let mut map = HashMap::new();
        if let Some(data) = data {
            map.insert(DATA_FIELD.to_string(), redis::Value::Data(data.to_vec()));
        }
        StreamId {
            id: id.to_string(),
            map,
        }
    }

    #[test]
    fn entries_without_payload_are_dropped() {
        let reply = StreamReadReply {
            keys: vec![StreamKey {
                key: "events".to_string(),
                ids: vec![
                    entry("1-0", Some(b"{}")),
                    entry("2-0", None),
                    entry("3-0", Some(b"[]")),
                ],
            }],
        };
        let records = stream_records(reply);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].position, "1-0");
        assert_eq!(records[1].payload, b"[]");
    }

    #[test]
    fn zero_idle_never_blocks_forever() {
        assert_eq!(block_millis(Duration::ZERO), 1);
        assert_eq!(block_millis(Duration::from_millis(250)), 250);
    }
}
