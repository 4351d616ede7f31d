//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external
//! systems. Adapters implement these traits to connect to real
//! infrastructure.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{LatestDocument, NewChangeEvent, NewSourceDocument};

/// Error type for document repository operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Port for the provenance store holding documents and change events.
///
/// The store is append-only from this system's point of view: documents
/// and events are inserted, never updated or deleted.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Most recent document captured for a canonical URL, if any
    async fn get_latest_document(
        &self,
        canonical_url: &str,
    ) -> Result<Option<LatestDocument>, RepositoryError>;

    /// Insert a new source document, returning its id
    async fn insert_document(
        &self,
        document: &NewSourceDocument,
    ) -> Result<String, RepositoryError>;

    /// Insert a change event, returning its id
    async fn insert_change_event(&self, event: &NewChangeEvent)
    -> Result<String, RepositoryError>;
}

/// Error type for content fetchers
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid payload: {0}")]
    Payload(String),
}

/// Canonical content produced by a source-family fetcher.
///
/// `bytes` is exactly what gets hashed and snapshotted. Canonicalization
/// (none for the legislation register, sorted-key JSON for the catalog,
/// main-content text for department pages) happens inside the fetcher so
/// the pipeline compares like with like across runs.
#[derive(Debug, Clone)]
pub struct FetchedContent {
    pub bytes: Vec<u8>,
    /// Title extracted from the payload, when the family has one
    pub title: Option<String>,
    /// Family-specific provenance attached to the stored document
    pub metadata: Map<String, Value>,
}

/// Port for fetching canonical content from an external source.
///
/// One implementation per source family. No retries here: a non-success
/// status or timeout surfaces as a `FetchError` and aborts the run.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, locator: &str) -> Result<FetchedContent, FetchError>;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
