use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::fs;

use telemetry_domain::ports::{AnomalyRepository, StatsRepository};
use telemetry_domain::{AnomalyRecord, EventStatistics};

use crate::utils::write_json_atomic;

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(value))
}

/// Statistics singleton kept in one JSON document.
pub struct JsonStatsRepository {
    path: PathBuf,
}

impl JsonStatsRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StatsRepository for JsonStatsRepository {
    async fn load(&self) -> Result<Option<EventStatistics>> {
        read_json(&self.path).await
    }

    async fn save(&self, stats: &EventStatistics) -> Result<()> {
        write_json_atomic(&self.path, stats).await
    }
}

/// Anomaly snapshot kept as one JSON array, replaced on every run.
pub struct JsonAnomalyRepository {
    path: PathBuf,
}

impl JsonAnomalyRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AnomalyRepository for JsonAnomalyRepository {
    async fn load_snapshot(&self) -> Result<Option<Vec<AnomalyRecord>>> {
        read_json(&self.path).await
    }

    async fn replace_snapshot(&self, anomalies: &[AnomalyRecord]) -> Result<()> {
        write_json_atomic(&self.path, anomalies).await
    }
}
