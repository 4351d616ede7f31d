//! Federal Register of Legislation fetcher
//!
//! Returns raw response bytes with no canonicalization: register pages
//! are compared byte-exact.

use async_trait::async_trait;
use regwatch_domain::{ContentFetcher, FetchError, FetchedContent};
use reqwest::Client;
use serde_json::Map;
use std::time::Duration;

use super::{build_client, ensure_success};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetcher for legislation register pages and instrument downloads
pub struct LegislationFetcher {
    client: Client,
}

impl LegislationFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
        }
    }
}

impl Default for LegislationFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl ContentFetcher for LegislationFetcher {
    async fn fetch(&self, locator: &str) -> Result<FetchedContent, FetchError> {
        let response = self
            .client
            .get(locator)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let response = ensure_success(response).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(FetchedContent {
            bytes: bytes.to_vec(),
            title: None,
            metadata: Map::new(),
        })
    }
}
