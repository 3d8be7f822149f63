use anyhow::{Context, Result};
use async_trait::async_trait;

use super::Source;

/// CSV export fetched with a plain GET; the body is treated like file contents.
pub struct LinkSource {
    url: String,
    client: reqwest::Client,
}

impl LinkSource {
    pub fn new(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl Source for LinkSource {
    fn name(&self) -> &str {
        &self.url
    }

    async fn fetch_text(&self) -> Result<String> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("CSV export request failed")?
            .error_for_status()
            .context("CSV export request returned an error status")?;

        resp.text().await.context("Failed to read CSV export body")
    }
}
