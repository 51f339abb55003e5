// Runtime configuration entities
// Built once at startup from the loaded AppConfig and passed down explicitly

use serde::{Deserialize, Serialize};

use crate::value_objects::StartPosition;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub consumer_group: String,
    pub consumer_name: String,
    pub log_start: StartPosition,
    pub log_idle_timeout_ms: u64,
    pub writer_retry_backoff_ms: u64,
    pub stats_interval_seconds: u64,
    pub score_max: i64,
    pub cpu_max: f64,
    pub max_body_bytes: u64,
    pub request_timeout_seconds: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            consumer_group: "event_group".to_string(),
            consumer_name: "storage-1".to_string(),
            log_start: StartPosition::Latest,
            log_idle_timeout_ms: 1000,
            writer_retry_backoff_ms: 1000,
            stats_interval_seconds: 5,
            score_max: 1_000_000,
            cpu_max: 90.0,
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 15,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: String,
    pub database_max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub backend: String,
    pub host: String,
    pub port: u16,
    pub topic: String,
}

impl BrokerConfig {
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/", self.host, self.port)
    }
}
