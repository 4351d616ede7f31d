//! Change event existence decision
//!
//! A purely structural step: given hash evidence, does an event exist at
//! all, and what minimal shape does it have. Scoring is layered on top by
//! the watch pipeline, which keeps this predicate testable without any
//! scoring dependency.

use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// Kind of transition a draft event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// First ever observation of this source
    InitialSnapshot,
    /// Content hash differs from the previously stored one
    ChangeDetected,
}

/// Minimal change event shape, before scoring.
#[derive(Debug, Clone)]
pub struct ChangeEventDraft {
    pub kind: EventKind,
    pub source_id: String,
    pub prev_hash: Option<String>,
    pub curr_hash: String,
    pub snapshot_path: PathBuf,
    /// Placeholder; the pipeline fills this in from the scorer
    pub impact_score: Option<u8>,
    /// Placeholder; the pipeline fills this in from the scorer
    pub requires_review: bool,
    pub detected_at: OffsetDateTime,
}

/// Decide whether a change event exists for this observation.
///
/// Returns `None` when `curr_hash` equals the stored previous hash:
/// identical content never produces an event.
pub fn build_change_event(
    source_id: &str,
    prev_hash: Option<&str>,
    curr_hash: &str,
    snapshot_path: &Path,
    detected_at: OffsetDateTime,
) -> Option<ChangeEventDraft> {
    if prev_hash == Some(curr_hash) {
        return None;
    }

    let kind = match prev_hash {
        None => EventKind::InitialSnapshot,
        Some(_) => EventKind::ChangeDetected,
    };

    Some(ChangeEventDraft {
        kind,
        source_id: source_id.to_string(),
        prev_hash: prev_hash.map(String::from),
        curr_hash: curr_hash.to_string(),
        snapshot_path: snapshot_path.to_path_buf(),
        impact_score: None,
        requires_review: false,
        detected_at,
    })
}
