use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use telemetry_domain::ports::EventRangeSource;
use telemetry_domain::utils::format_timestamp;
use telemetry_domain::{PlayerEvent, ServerEvent, TimeRange};

/// Reads persisted events through the store service's range endpoints.
pub struct StoreServiceClient {
    client: Client,
    base_url: String,
}

impl StoreServiceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn range_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn fetch_range<T: DeserializeOwned>(&self, path: &str, range: TimeRange) -> Result<Vec<T>> {
        let url = self.range_url(path);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("start_timestamp", format_timestamp(&range.start)),
                ("end_timestamp", format_timestamp(&range.end)),
            ])
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl EventRangeSource for StoreServiceClient {
    async fn fetch_player_events(&self, range: TimeRange) -> Result<Vec<PlayerEvent>> {
        self.fetch_range("player-events", range).await
    }

    async fn fetch_server_events(&self, range: TimeRange) -> Result<Vec<ServerEvent>> {
        self.fetch_range("server-events", range).await
    }

    async fn ping(&self) -> Result<()> {
        self.client
            .get(self.range_url("health/live"))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
