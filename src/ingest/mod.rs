pub mod file;
pub mod link;
pub mod mapper;

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use crate::config::AppConfig;
use crate::model::record::Record;
use mapper::RowMapper;

/// Anything that can hand back the text of one CSV export.
#[async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch_text(&self) -> Result<String>;
}


/// Build the enabled sources in config order: files first, then links.
pub fn create_sources(config: &AppConfig) -> Result<Vec<Box<dyn Source>>> {
    let mut sources: Vec<Box<dyn Source>> = Vec::new();

    if config.global.read_from_files {
        for path in config.file_paths() {
            sources.push(Box::new(file::FileSource::new(path)));
        }
    }
    if config.global.read_from_links {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.global.http_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("Failed to build HTTP client")?;
        for url in config.link_urls() {
            sources.push(Box::new(link::LinkSource::new(url, client.clone())));
        }
    }

    Ok(sources)
}

/// Read every source in turn and concatenate their records. The first failure aborts.
pub async fn collect_records(
    sources: &[Box<dyn Source>],
    mapper: &RowMapper,
) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for source in sources {
        let text = source
            .fetch_text()
            .await
            .with_context(|| format!("Failed to read {}", source.name()))?;
        let mapped = mapper
            .map_document(&text)
            .with_context(|| format!("Failed to map rows from {}", source.name()))?;
        info!(source = source.name(), records = mapped.len(), "loaded export");
        records.extend(mapped);
    }
    Ok(records)
}
