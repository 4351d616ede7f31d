//! Domain models and value objects

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use time::OffsetDateTime;

/// Classification tier of a watched source.
///
/// The tier feeds the impact scorer: acts and regulations carry the
/// highest legal weight and receive a scoring bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    /// Act on the Federal Register of Legislation
    FrlAct,
    /// Regulations or other subordinate instrument on the register
    FrlRegs,
    /// Home Affairs policy page
    HomeaffairsPage,
    /// data.gov.au CKAN dataset
    DatagovDataset,
}

impl SourceType {
    pub const ALL: [SourceType; 4] = [
        SourceType::FrlAct,
        SourceType::FrlRegs,
        SourceType::HomeaffairsPage,
        SourceType::DatagovDataset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::FrlAct => "FRL_ACT",
            SourceType::FrlRegs => "FRL_REGS",
            SourceType::HomeaffairsPage => "HOMEAFFAIRS_PAGE",
            SourceType::DatagovDataset => "DATAGOV_DATASET",
        }
    }

    /// Statute-level and subordinate-regulation-level sources.
    pub fn is_high_tier(&self) -> bool {
        matches!(self, SourceType::FrlAct | SourceType::FrlRegs)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = UnknownSourceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownSourceType {
                input: s.to_string(),
            })
    }
}

/// Rejection of an unrecognized source type string.
#[derive(Debug, thiserror::Error)]
#[error("Unknown source type '{input}'. Expected one of: FRL_ACT, FRL_REGS, HOMEAFFAIRS_PAGE, DATAGOV_DATASET")]
pub struct UnknownSourceType {
    pub input: String,
}

/// Kind of transition recorded on a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// First ever capture of a canonical URL
    InitialSnapshot,
    /// Page or instrument text changed
    TextChange,
    /// Dataset metadata changed
    DatasetUpdate,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::InitialSnapshot => "initial_snapshot",
            ChangeType::TextChange => "text_change",
            ChangeType::DatasetUpdate => "dataset_update",
        }
    }

    /// Change type recorded for a non-initial transition of the given
    /// source family.
    pub fn update_for(source_type: SourceType) -> Self {
        match source_type {
            SourceType::DatagovDataset => ChangeType::DatasetUpdate,
            _ => ChangeType::TextChange,
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Most recent stored document for a canonical URL, as returned by the
/// repository's latest-document lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestDocument {
    pub id: String,
    pub content_hash: String,
    #[serde(with = "time::serde::rfc3339")]
    pub retrieved_at: OffsetDateTime,
    pub status: String,
}

/// Insert-side record for the append-only source document store.
///
/// Documents are immutable once created: a new capture of the same
/// canonical URL inserts a new row rather than mutating an old one.
#[derive(Debug, Clone, Serialize)]
pub struct NewSourceDocument {
    pub source_type: SourceType,
    pub title: String,
    /// Identity key for latest-document lookups
    pub canonical_url: String,
    pub content_hash: String,
    /// Where the raw bytes live on snapshot storage
    pub raw_content_location: String,
    #[serde(with = "time::serde::rfc3339")]
    pub retrieved_at: OffsetDateTime,
    /// Free-form provenance metadata (dataset id, resource counts, ...)
    pub metadata: Map<String, Value>,
    pub status: String,
    /// ISO date the instrument takes effect, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_from: Option<String>,
}

/// Insert-side record for a detected transition between two documents.
#[derive(Debug, Clone, Serialize)]
pub struct NewChangeEvent {
    pub new_document_id: String,
    /// Absent for the very first observation of a URL
    pub old_document_id: Option<String>,
    pub change_type: ChangeType,
    /// 0-100
    pub impact_score: u8,
    pub requires_review: bool,
    pub summary: String,
    pub affected_visa_ids: Vec<String>,
}

/// Metadata describing one raw-bytes capture on durable storage.
///
/// Ephemeral: consumed to populate `NewSourceDocument` and for
/// hash-equality checks, never stored relationally itself.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotMetadata {
    pub source_id: String,
    pub snapshot_path: PathBuf,
    pub content_hash: String,
    pub byte_size: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub captured_at: OffsetDateTime,
}

/// Result of a single watch run for one source.
#[derive(Debug, Clone)]
pub struct WatchOutcome {
    /// Newly inserted document id, or the prior document's id when
    /// nothing changed
    pub document_id: Option<String>,
    pub change_event_id: Option<String>,
    pub impact_score: u8,
    pub requires_review: bool,
    pub signals: Vec<String>,
    pub snapshot: SnapshotMetadata,
}
