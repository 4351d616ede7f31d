//! Per-family content fetchers
//!
//! One implementation of the `ContentFetcher` port per source family.
//! Each family owns its canonicalization: the bytes a fetcher returns are
//! exactly what gets hashed and snapshotted.

mod catalog;
mod department;
mod legislation;

pub use catalog::CatalogFetcher;
pub use department::{DepartmentFetcher, extract_sections};
pub use legislation::LegislationFetcher;

use regwatch_domain::FetchError;
use reqwest::Client;
use std::time::Duration;

pub(crate) fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to build HTTP client")
}

/// Map a non-success response to a fetch error, consuming the body.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, FetchError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(FetchError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}
