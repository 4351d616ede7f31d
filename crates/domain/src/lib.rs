//! regwatch domain crate
//!
//! Core change-detection and impact-scoring logic following hexagonal
//! architecture:
//! - `model`: Domain entities and value objects
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `scoring`: Deterministic impact scoring rules
//! - `event`: Change event existence decision
//! - `snapshot`: Raw content snapshot store
//! - `usecases`: Watch pipeline orchestration

pub mod event;
pub mod model;
pub mod ports;
pub mod scoring;
pub mod snapshot;
pub mod usecases;

pub use model::*;
pub use ports::*;

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hex digest of raw content bytes.
///
/// This is the sole change-detection fingerprint: byte-exact, so
/// whitespace and element ordering count as changes.
pub fn hash_content(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}
