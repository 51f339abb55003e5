use std::env;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::warn;

use telemetry_domain::{BrokerConfig, DbConfig, RuntimeConfig, StartPosition};

use super::validation::{
    validate_bind_addr, validate_log_backend, validate_not_blank, validate_positive,
};

pub const DEFAULT_CONFIG_PATH: &str = "./config.toml";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub ingress_bind_addr: String,
    pub store_bind_addr: String,
    pub stats_bind_addr: String,
    pub query_bind_addr: String,
    pub anomaly_bind_addr: String,
    pub log_backend: String,
    pub broker_host: String,
    pub broker_port: u16,
    pub topic: String,
    pub consumer_group: String,
    pub consumer_name: String,
    pub log_start: String,
    pub log_idle_timeout_ms: u64,
    pub database_url: String,
    pub database_max_connections: u32,
    pub store_url: String,
    pub stats_path: String,
    pub stats_interval_seconds: u64,
    pub anomaly_path: String,
    pub score_max: i64,
    pub cpu_max: f64,
    pub writer_retry_backoff_ms: u64,
    pub max_body_bytes: u64,
    pub request_timeout_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ingress_bind_addr: "0.0.0.0:8080".to_string(),
            store_bind_addr: "0.0.0.0:8090".to_string(),
            stats_bind_addr: "0.0.0.0:8100".to_string(),
            query_bind_addr: "0.0.0.0:8110".to_string(),
            anomaly_bind_addr: "0.0.0.0:8200".to_string(),
            log_backend: "redis".to_string(),
            broker_host: "127.0.0.1".to_string(),
            broker_port: 6379,
            topic: "events".to_string(),
            consumer_group: "event_group".to_string(),
            consumer_name: "storage-1".to_string(),
            log_start: "latest".to_string(),
            log_idle_timeout_ms: 1000,
            database_url: "sqlite://telemetry.db?mode=rwc".to_string(),
            database_max_connections: 5,
            store_url: "http://127.0.0.1:8090".to_string(),
            stats_path: "./data/stats.json".to_string(),
            stats_interval_seconds: 5,
            anomaly_path: "./data/anomalies.json".to_string(),
            score_max: 1_000_000,
            cpu_max: 90.0,
            writer_retry_backoff_ms: 1000,
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 15,
        }
    }
}

impl AppConfig {
    /// `path` wins over `TELEMETRY_CONFIG`, which wins over `./config.toml`.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => env::var("TELEMETRY_CONFIG")
                .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
                .into(),
        };
        let base_dir = path.parent();
        let mut config = if path.exists() {
            let content = fs::read_to_string(&path).await?;
            Self::parse(&path, &content)?
        } else {
            warn!("{} not found, using defaults", path.display());
            AppConfig::default()
        };
        config.apply_env_overrides(|key| env::var(key).ok())?;
        config.resolve_paths(base_dir);
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        let config = match extension.as_deref() {
            Some("yml") | Some("yaml") => serde_yaml::from_str(content)?,
            _ => toml::from_str(content)?,
        };
        Ok(config)
    }

    pub fn normalize(&mut self) {
        self.log_backend = self.log_backend.trim().to_ascii_lowercase();
        self.log_start = self.log_start.trim().to_ascii_lowercase();
        self.store_url = self.store_url.trim().trim_end_matches('/').to_string();
    }

    fn resolve_paths(&mut self, base_dir: Option<&Path>) {
        let Some(base) = base_dir else {
            return;
        };
        self.stats_path = resolve_path(base, &self.stats_path);
        self.anomaly_path = resolve_path(base, &self.anomaly_path);
    }

    pub fn validate(&self) -> Result<()> {
        validate_bind_addr("ingress_bind_addr", &self.ingress_bind_addr)?;
        validate_bind_addr("store_bind_addr", &self.store_bind_addr)?;
        validate_bind_addr("stats_bind_addr", &self.stats_bind_addr)?;
        validate_bind_addr("query_bind_addr", &self.query_bind_addr)?;
        validate_bind_addr("anomaly_bind_addr", &self.anomaly_bind_addr)?;
        validate_log_backend(&self.log_backend)?;
        validate_not_blank("broker_host", &self.broker_host)?;
        validate_not_blank("topic", &self.topic)?;
        validate_not_blank("consumer_group", &self.consumer_group)?;
        validate_not_blank("consumer_name", &self.consumer_name)?;
        validate_not_blank("database_url", &self.database_url)?;
        validate_not_blank("store_url", &self.store_url)?;
        validate_not_blank("stats_path", &self.stats_path)?;
        validate_not_blank("anomaly_path", &self.anomaly_path)?;
        if StartPosition::parse(&self.log_start).is_none() {
            return Err(anyhow!(
                "invalid log_start '{}', expected earliest or latest",
                self.log_start
            ));
        }
        validate_positive("log_idle_timeout_ms", self.log_idle_timeout_ms)?;
        validate_positive("stats_interval_seconds", self.stats_interval_seconds)?;
        validate_positive("writer_retry_backoff_ms", self.writer_retry_backoff_ms)?;
        validate_positive("max_body_bytes", self.max_body_bytes)?;
        validate_positive("request_timeout_seconds", self.request_timeout_seconds)?;
        validate_positive(
            "database_max_connections",
            u64::from(self.database_max_connections),
        )?;
        if !self.cpu_max.is_finite() {
            return Err(anyhow!("cpu_max must be a finite number"));
        }
        Ok(())
    }

    pub fn to_runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            consumer_group: self.consumer_group.clone(),
            consumer_name: self.consumer_name.clone(),
            log_start: StartPosition::parse(&self.log_start).unwrap_or_default(),
            log_idle_timeout_ms: self.log_idle_timeout_ms,
            writer_retry_backoff_ms: self.writer_retry_backoff_ms,
            stats_interval_seconds: self.stats_interval_seconds,
            score_max: self.score_max,
            cpu_max: self.cpu_max,
            max_body_bytes: self.max_body_bytes,
            request_timeout_seconds: self.request_timeout_seconds,
        }
    }

    pub fn to_db_config(&self) -> DbConfig {
        DbConfig {
            database_url: self.database_url.clone(),
            database_max_connections: self.database_max_connections,
        }
    }

    pub fn to_broker_config(&self) -> BrokerConfig {
        BrokerConfig {
            backend: self.log_backend.clone(),
            host: self.broker_host.clone(),
            port: self.broker_port,
            topic: self.topic.clone(),
        }
    }

    /// Applies `TELEMETRY_*` (and bare `SCORE_MAX`/`CPU_MAX`) overrides. A
    /// numeric override that does not parse is an error.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string_overrides: [(&str, &mut String); 15] = [
            ("TELEMETRY_INGRESS_BIND_ADDR", &mut self.ingress_bind_addr),
            ("TELEMETRY_STORE_BIND_ADDR", &mut self.store_bind_addr),
            ("TELEMETRY_STATS_BIND_ADDR", &mut self.stats_bind_addr),
            ("TELEMETRY_QUERY_BIND_ADDR", &mut self.query_bind_addr),
            ("TELEMETRY_ANOMALY_BIND_ADDR", &mut self.anomaly_bind_addr),
            ("TELEMETRY_LOG_BACKEND", &mut self.log_backend),
            ("TELEMETRY_BROKER_HOST", &mut self.broker_host),
            ("TELEMETRY_TOPIC", &mut self.topic),
            ("TELEMETRY_CONSUMER_GROUP", &mut self.consumer_group),
            ("TELEMETRY_CONSUMER_NAME", &mut self.consumer_name),
            ("TELEMETRY_LOG_START", &mut self.log_start),
            ("TELEMETRY_DATABASE_URL", &mut self.database_url),
            ("TELEMETRY_STORE_URL", &mut self.store_url),
            ("TELEMETRY_STATS_PATH", &mut self.stats_path),
            ("TELEMETRY_ANOMALY_PATH", &mut self.anomaly_path),
        ];
        for (key, field) in string_overrides {
            if let Some(value) = lookup(key) {
                *field = value;
            }
        }
        override_number(&lookup, "TELEMETRY_BROKER_PORT", &mut self.broker_port)?;
        override_number(&lookup, "TELEMETRY_LOG_IDLE_TIMEOUT_MS", &mut self.log_idle_timeout_ms)?;
        override_number(
            &lookup,
            "TELEMETRY_DATABASE_MAX_CONNECTIONS",
            &mut self.database_max_connections,
        )?;
        override_number(
            &lookup,
            "TELEMETRY_STATS_INTERVAL_SECONDS",
            &mut self.stats_interval_seconds,
        )?;
        override_number(
            &lookup,
            "TELEMETRY_WRITER_RETRY_BACKOFF_MS",
            &mut self.writer_retry_backoff_ms,
        )?;
        override_number(&lookup, "TELEMETRY_MAX_BODY_BYTES", &mut self.max_body_bytes)?;
        override_number(
            &lookup,
            "TELEMETRY_REQUEST_TIMEOUT_SECONDS",
            &mut self.request_timeout_seconds,
        )?;
        // Bare names are honored for compatibility with existing deployments.
        for key in ["SCORE_MAX", "TELEMETRY_SCORE_MAX"] {
            override_number(&lookup, key, &mut self.score_max)?;
        }
        for key in ["CPU_MAX", "TELEMETRY_CPU_MAX"] {
            override_number(&lookup, key, &mut self.cpu_max)?;
        }
        Ok(())
    }
}

fn override_number<F, T>(lookup: &F, key: &str, field: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    if let Some(value) = lookup(key) {
        *field = value
            .trim()
            .parse()
            .map_err(|err| anyhow!("invalid {} '{}': {}", key, value, err))?;
    }
    Ok(())
}

fn resolve_path(base: &Path, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return trimmed.to_string();
    }
    let path = Path::new(trimmed);
    if path.is_absolute() {
        trimmed.to_string()
    } else {
        base.join(path).to_string_lossy().to_string()
    }
}
