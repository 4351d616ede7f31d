//! Watch pipeline use case - one end-to-end run per watched source
//!
//! Composes lookup, fetch, hash comparison, snapshotting, scoring, and
//! persistence. The pipeline is shared across source families: families
//! differ only in their `ContentFetcher` and in the change type recorded
//! for updates, derived from the source type.

use std::sync::Arc;

use serde_json::Value;

use crate::{
    event::{EventKind, build_change_event},
    model::{ChangeType, NewChangeEvent, NewSourceDocument, SourceType, WatchOutcome},
    ports::{Clock, ContentFetcher, DocumentRepository, FetchError, RepositoryError},
    scoring,
    snapshot::{SnapshotError, SnapshotStore},
};

/// One watched source, as configured.
#[derive(Debug, Clone)]
pub struct WatchSource {
    /// Stable identifier used in snapshot file names and summaries
    pub source_id: String,
    /// What the fetcher is pointed at: a URL or a dataset id
    pub locator: String,
    /// Identity key for latest-document lookups
    pub canonical_url: String,
    /// Display title; falls back to the fetched title, then the source id
    pub title: Option<String>,
    pub source_type: SourceType,
    /// Optional ISO date recorded on the stored document
    pub effective_from: Option<String>,
}

/// Errors from a watch run
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Watch pipeline orchestrator.
///
/// Each run is self-contained: one repository read, one fetch, one disk
/// write, zero-or-more repository writes. No retries, no shared state
/// between runs.
pub struct WatchPipeline<R, F, C>
where
    R: DocumentRepository + ?Sized,
    F: ContentFetcher + ?Sized,
    C: Clock + ?Sized,
{
    repository: Arc<R>,
    fetcher: Arc<F>,
    snapshots: SnapshotStore,
    clock: Arc<C>,
}

impl<R, F, C> WatchPipeline<R, F, C>
where
    R: DocumentRepository + ?Sized,
    F: ContentFetcher + ?Sized,
    C: Clock + ?Sized,
{
    pub fn new(
        repository: Arc<R>,
        fetcher: Arc<F>,
        snapshots: SnapshotStore,
        clock: Arc<C>,
    ) -> Self {
        Self {
            repository,
            fetcher,
            snapshots,
            clock,
        }
    }

    /// Run the pipeline once for one source.
    ///
    /// A snapshot is written even when nothing changed, for audit
    /// continuity. Writes are not transactional: a failed event insert
    /// leaves the already-inserted document in place and surfaces the
    /// error; the scheduler owns re-invocation.
    pub async fn run(&self, source: &WatchSource) -> Result<WatchOutcome, WatchError> {
        let prev = self
            .repository
            .get_latest_document(&source.canonical_url)
            .await?;
        let prev_hash = prev.as_ref().map(|doc| doc.content_hash.as_str());
        let prev_doc_id = prev.as_ref().map(|doc| doc.id.clone());

        tracing::debug!(
            source_id = %source.source_id,
            canonical_url = %source.canonical_url,
            prev_hash = ?prev_hash,
            "Fetching source"
        );

        let fetched = self.fetcher.fetch(&source.locator).await?;
        let now = self.clock.now();
        let snapshot = self
            .snapshots
            .write(&fetched.bytes, &source.source_id, now)?;

        let Some(draft) = build_change_event(
            &source.source_id,
            prev_hash,
            &snapshot.content_hash,
            &snapshot.snapshot_path,
            now,
        ) else {
            tracing::info!(
                source_id = %source.source_id,
                content_hash = %snapshot.content_hash,
                "No change detected"
            );
            return Ok(WatchOutcome {
                document_id: prev_doc_id,
                change_event_id: None,
                impact_score: 0,
                requires_review: false,
                signals: vec!["no change detected: identical content hash".to_string()],
                snapshot,
            });
        };

        // Prior raw bytes are not re-read from snapshot storage at this
        // point, so the scorer runs with prev_content absent even for
        // non-first transitions. Known scope limitation; see DESIGN.md.
        let score = scoring::score(None, &fetched.bytes, source.source_type);

        let title = source
            .title
            .clone()
            .or(fetched.title)
            .unwrap_or_else(|| source.source_id.clone());

        let mut metadata = fetched.metadata;
        metadata.insert(
            "source_id".to_string(),
            Value::String(source.source_id.clone()),
        );
        metadata.insert("byte_size".to_string(), Value::from(snapshot.byte_size));

        let document = NewSourceDocument {
            source_type: source.source_type,
            title: title.clone(),
            canonical_url: source.canonical_url.clone(),
            content_hash: snapshot.content_hash.clone(),
            raw_content_location: snapshot.snapshot_path.display().to_string(),
            retrieved_at: now,
            metadata,
            status: "current".to_string(),
            effective_from: source.effective_from.clone(),
        };
        let document_id = self.repository.insert_document(&document).await?;

        let change_type = match draft.kind {
            EventKind::InitialSnapshot => ChangeType::InitialSnapshot,
            EventKind::ChangeDetected => ChangeType::update_for(source.source_type),
        };

        let event = NewChangeEvent {
            new_document_id: document_id.clone(),
            old_document_id: prev_doc_id,
            change_type,
            impact_score: score.score,
            requires_review: score.requires_review,
            summary: format!(
                "{} changed: {}. Signals: {}",
                title,
                source.source_id,
                score.signals.join("; ")
            ),
            affected_visa_ids: Vec::new(),
        };
        let change_event_id = self.repository.insert_change_event(&event).await?;

        tracing::info!(
            source_id = %source.source_id,
            document_id = %document_id,
            change_event_id = %change_event_id,
            change_type = %change_type,
            impact_score = score.score,
            requires_review = score.requires_review,
            "Change event recorded"
        );

        Ok(WatchOutcome {
            document_id: Some(document_id),
            change_event_id: Some(change_event_id),
            impact_score: score.score,
            requires_review: score.requires_review,
            signals: score.signals,
            snapshot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash_content;
    use crate::model::LatestDocument;
    use crate::ports::FetchedContent;
    use serde_json::Map;
    use std::sync::Mutex;
    use time::OffsetDateTime;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2024-10-15 04:00:00 UTC);

    const ACT_HTML: &[u8] = b"<html><body><h1>Migration Act 1958</h1></body></html>";

    // Fake implementations for testing

    struct FakeRepository {
        latest: Option<LatestDocument>,
        documents: Mutex<Vec<NewSourceDocument>>,
        events: Mutex<Vec<NewChangeEvent>>,
    }

    impl FakeRepository {
        fn empty() -> Self {
            Self {
                latest: None,
                documents: Mutex::new(Vec::new()),
                events: Mutex::new(Vec::new()),
            }
        }

        fn with_latest(content_hash: String) -> Self {
            Self {
                latest: Some(LatestDocument {
                    id: "doc-prev".to_string(),
                    content_hash,
                    retrieved_at: datetime!(2024-07-01 00:00:00 UTC),
                    status: "current".to_string(),
                }),
                documents: Mutex::new(Vec::new()),
                events: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl DocumentRepository for FakeRepository {
        async fn get_latest_document(
            &self,
            _canonical_url: &str,
        ) -> Result<Option<LatestDocument>, RepositoryError> {
            Ok(self.latest.clone())
        }

        async fn insert_document(
            &self,
            document: &NewSourceDocument,
        ) -> Result<String, RepositoryError> {
            let mut documents = self.documents.lock().unwrap();
            documents.push(document.clone());
            Ok(format!("doc-{}", documents.len()))
        }

        async fn insert_change_event(
            &self,
            event: &NewChangeEvent,
        ) -> Result<String, RepositoryError> {
            let mut events = self.events.lock().unwrap();
            events.push(event.clone());
            Ok(format!("event-{}", events.len()))
        }
    }

    struct FakeFetcher {
        content: Vec<u8>,
    }

    #[async_trait::async_trait]
    impl ContentFetcher for FakeFetcher {
        async fn fetch(&self, _locator: &str) -> Result<FetchedContent, FetchError> {
            Ok(FetchedContent {
                bytes: self.content.clone(),
                title: None,
                metadata: Map::new(),
            })
        }
    }

    struct FailingFetcher;

    #[async_trait::async_trait]
    impl ContentFetcher for FailingFetcher {
        async fn fetch(&self, _locator: &str) -> Result<FetchedContent, FetchError> {
            Err(FetchError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            })
        }
    }

    struct FakeClock;

    impl Clock for FakeClock {
        fn now(&self) -> OffsetDateTime {
            NOW
        }
    }

    fn source(source_type: SourceType) -> WatchSource {
        WatchSource {
            source_id: "frl_migration_act".to_string(),
            locator: "https://www.legislation.gov.au/C1958A00062/latest".to_string(),
            canonical_url: "https://www.legislation.gov.au/C1958A00062".to_string(),
            title: Some("Migration Act 1958".to_string()),
            source_type,
            effective_from: None,
        }
    }

    fn pipeline(
        repository: Arc<FakeRepository>,
        fetcher: Arc<dyn ContentFetcher>,
        root: &std::path::Path,
    ) -> WatchPipeline<FakeRepository, dyn ContentFetcher, FakeClock> {
        WatchPipeline::new(
            repository,
            fetcher,
            SnapshotStore::new(root),
            Arc::new(FakeClock),
        )
    }

    #[tokio::test]
    async fn first_observation_persists_document_and_event() {
        let dir = tempfile::tempdir().unwrap();
        let repository = Arc::new(FakeRepository::empty());
        let fetcher = Arc::new(FakeFetcher {
            content: ACT_HTML.to_vec(),
        });

        let outcome = pipeline(Arc::clone(&repository), fetcher, dir.path())
            .run(&source(SourceType::FrlAct))
            .await
            .unwrap();

        assert_eq!(outcome.document_id.as_deref(), Some("doc-1"));
        assert_eq!(outcome.change_event_id.as_deref(), Some("event-1"));
        // 10 base + 20 initial + 20 high tier
        assert!(outcome.impact_score >= 30);
        assert!(outcome.signals.iter().any(|s| s.contains("initial snapshot")));
        assert!(outcome.signals.iter().any(|s| s.contains("high-tier")));

        let events = repository.events.lock().unwrap();
        assert_eq!(events[0].change_type, ChangeType::InitialSnapshot);
        assert!(events[0].old_document_id.is_none());

        let documents = repository.documents.lock().unwrap();
        assert_eq!(documents[0].content_hash, hash_content(ACT_HTML));
        assert_eq!(documents[0].status, "current");
        assert!(outcome.snapshot.snapshot_path.exists());
    }

    #[tokio::test]
    async fn unchanged_hash_short_circuits_without_writes() {
        let dir = tempfile::tempdir().unwrap();
        let repository = Arc::new(FakeRepository::with_latest(hash_content(ACT_HTML)));
        let fetcher = Arc::new(FakeFetcher {
            content: ACT_HTML.to_vec(),
        });

        let outcome = pipeline(Arc::clone(&repository), fetcher, dir.path())
            .run(&source(SourceType::FrlAct))
            .await
            .unwrap();

        assert_eq!(outcome.document_id.as_deref(), Some("doc-prev"));
        assert!(outcome.change_event_id.is_none());
        assert_eq!(outcome.impact_score, 0);
        assert!(!outcome.requires_review);
        assert!(outcome.signals.iter().any(|s| s.contains("no change detected")));

        assert!(repository.documents.lock().unwrap().is_empty());
        assert!(repository.events.lock().unwrap().is_empty());
        // Snapshot is still taken for audit continuity
        assert!(outcome.snapshot.snapshot_path.exists());
    }

    #[tokio::test]
    async fn changed_hash_records_update_with_old_document_reference() {
        let dir = tempfile::tempdir().unwrap();
        let repository = Arc::new(FakeRepository::with_latest(hash_content(b"old bytes")));
        let fetcher = Arc::new(FakeFetcher {
            content: ACT_HTML.to_vec(),
        });

        let outcome = pipeline(Arc::clone(&repository), fetcher, dir.path())
            .run(&source(SourceType::HomeaffairsPage))
            .await
            .unwrap();

        assert_eq!(outcome.document_id.as_deref(), Some("doc-1"));

        let events = repository.events.lock().unwrap();
        assert_eq!(events[0].change_type, ChangeType::TextChange);
        assert_eq!(events[0].old_document_id.as_deref(), Some("doc-prev"));
        assert_eq!(events[0].new_document_id, "doc-1");
    }

    #[tokio::test]
    async fn catalog_updates_are_tagged_dataset_update() {
        let dir = tempfile::tempdir().unwrap();
        let repository = Arc::new(FakeRepository::with_latest(hash_content(b"old metadata")));
        let fetcher = Arc::new(FakeFetcher {
            content: b"{\"title\":\"Visa statistics\"}".to_vec(),
        });

        let mut src = source(SourceType::DatagovDataset);
        src.source_id = "datagov_visa_stats".to_string();

        pipeline(Arc::clone(&repository), fetcher, dir.path())
            .run(&src)
            .await
            .unwrap();

        let events = repository.events.lock().unwrap();
        assert_eq!(events[0].change_type, ChangeType::DatasetUpdate);
    }

    #[tokio::test]
    async fn high_impact_change_is_flagged_for_review() {
        // 10 base + 20 initial-branch + 30 keyword + 20 tier = 80
        let dir = tempfile::tempdir().unwrap();
        let repository = Arc::new(FakeRepository::with_latest(hash_content(b"old")));
        let fetcher = Arc::new(FakeFetcher {
            content: b"<p>English language requirement repealed.</p>".to_vec(),
        });

        let outcome = pipeline(Arc::clone(&repository), fetcher, dir.path())
            .run(&source(SourceType::FrlRegs))
            .await
            .unwrap();

        assert_eq!(outcome.impact_score, 80);
        assert!(outcome.requires_review);

        let events = repository.events.lock().unwrap();
        assert!(events[0].requires_review);
        assert_eq!(events[0].impact_score, 80);
        assert!(events[0].summary.contains("Signals:"));
    }

    #[tokio::test]
    async fn fetch_error_propagates_and_nothing_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let repository = Arc::new(FakeRepository::empty());

        let result = pipeline(Arc::clone(&repository), Arc::new(FailingFetcher), dir.path())
            .run(&source(SourceType::FrlAct))
            .await;

        assert!(matches!(result, Err(WatchError::Fetch(_))));
        assert!(repository.documents.lock().unwrap().is_empty());
        assert!(repository.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn document_metadata_carries_source_id_and_byte_size() {
        let dir = tempfile::tempdir().unwrap();
        let repository = Arc::new(FakeRepository::empty());
        let fetcher = Arc::new(FakeFetcher {
            content: ACT_HTML.to_vec(),
        });

        pipeline(Arc::clone(&repository), fetcher, dir.path())
            .run(&source(SourceType::FrlAct))
            .await
            .unwrap();

        let documents = repository.documents.lock().unwrap();
        let metadata = &documents[0].metadata;
        assert_eq!(
            metadata.get("source_id").and_then(|v| v.as_str()),
            Some("frl_migration_act")
        );
        assert_eq!(
            metadata.get("byte_size").and_then(|v| v.as_u64()),
            Some(ACT_HTML.len() as u64)
        );
    }
}
