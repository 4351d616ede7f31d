//! Raw content snapshots on durable storage
//!
//! Every capture is retained: file names carry the capture timestamp, so
//! repeated unchanged captures produce distinct files and nothing written
//! here is ever overwritten or deleted by this system.

use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::hash_content;
use crate::model::SnapshotMetadata;

/// UTC timestamp embedded in snapshot file names, e.g. 20240701T093000Z
const FILE_STAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day]T[hour][minute][second]Z");

/// Error type for snapshot storage
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Timestamp format error: {0}")]
    Format(#[from] time::error::Format),
}

/// Writes point-in-time captures of raw source bytes under a root directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Persist one capture and return its metadata.
    ///
    /// Creates the root directory if absent and writes exactly one file
    /// named `{source_id}_{YYYYMMDDThhmmssZ}.bin`. Storage faults
    /// propagate to the caller uninterpreted; nothing is retried here.
    pub fn write(
        &self,
        content: &[u8],
        source_id: &str,
        captured_at: OffsetDateTime,
    ) -> Result<SnapshotMetadata, SnapshotError> {
        fs::create_dir_all(&self.root)?;

        let captured_at = captured_at.to_offset(UtcOffset::UTC);
        let stamp = captured_at.format(&FILE_STAMP)?;
        let path = self.root.join(format!("{source_id}_{stamp}.bin"));
        fs::write(&path, content)?;

        Ok(SnapshotMetadata {
            source_id: source_id.to_string(),
            snapshot_path: path,
            content_hash: hash_content(content),
            byte_size: content.len(),
            captured_at,
        })
    }
}
