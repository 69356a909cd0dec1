use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::DataSource;
use super::cache::ResponseCache;
use crate::config::AppConfig;
use crate::core::RawDocument;
use crate::error::SourceError;

/// The live Prow API behind a time-based disk cache.
pub struct ApiSource {
    url: String,
    client: reqwest::Client,
    cache: ResponseCache,
}

impl ApiSource {
    pub fn new(config: &AppConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            url: config.api_url.clone(),
            client,
            cache: ResponseCache::new(
                &config.cache_dir,
                Duration::from_secs(config.cache_ttl_secs),
            ),
        })
    }
}

#[async_trait]
impl DataSource for ApiSource {
    async fn fetch(&self, use_cache: bool) -> Result<RawDocument, SourceError> {
        if use_cache {
            if let Some(body) = self.cache.get(&self.url).await {
                debug!(url = %self.url, "Using cached prow jobs");
                return Ok(serde_json::from_slice(&body)?);
            }
        }

        info!(url = %self.url, "Fetching prow jobs");
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let doc: RawDocument = serde_json::from_slice(&body)?;
        debug!(items = doc.items.len(), bytes = body.len(), "Fetched prow jobs");

        self.cache.put(&self.url, &body).await;
        Ok(doc)
    }
}
