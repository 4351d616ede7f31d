//! Department page fetcher with main-content extraction
//!
//! Pages are canonicalized to the text of their main content region
//! before hashing, so chrome and boilerplate churn outside `<main>` does
//! not register as a change.

use async_trait::async_trait;
use regwatch_domain::{ContentFetcher, FetchError, FetchedContent};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde_json::Map;
use std::time::Duration;

use super::{build_client, ensure_success};

const USER_AGENT: &str = "RegWatchBot/1.0";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetcher for department web pages (immi.homeaffairs.gov.au)
pub struct DepartmentFetcher {
    client: Client,
}

impl DepartmentFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
        }
    }
}

impl Default for DepartmentFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl ContentFetcher for DepartmentFetcher {
    async fn fetch(&self, locator: &str) -> Result<FetchedContent, FetchError> {
        let response = self
            .client
            .get(locator)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let response = ensure_success(response).await?;

        let html = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let section_text = extract_sections(&html);

        Ok(FetchedContent {
            bytes: section_text.into_bytes(),
            title: None,
            metadata: Map::new(),
        })
    }
}

/// Normalized text of the page's main content region.
///
/// Prefers `<main>`, then `<article>`, then the whole `<body>`. Text
/// nodes are trimmed and joined with newlines; this is the unit of
/// comparison for change detection on department pages.
pub fn extract_sections(html: &str) -> String {
    let document = Html::parse_document(html);
    for css in ["main", "article", "body"] {
        let selector = Selector::parse(css).unwrap();
        if let Some(element) = document.select(&selector).next() {
            return collect_text(element);
        }
    }
    String::new()
}

fn collect_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
