//! In-memory document repository for testing and dry runs

use async_trait::async_trait;
use regwatch_domain::{
    DocumentRepository, LatestDocument, NewChangeEvent, NewSourceDocument, RepositoryError,
};
use std::sync::RwLock;

struct StoredDocument {
    id: String,
    document: NewSourceDocument,
}

/// In-memory document repository implementation
pub struct InMemoryDocumentRepository {
    documents: RwLock<Vec<StoredDocument>>,
    events: RwLock<Vec<(String, NewChangeEvent)>>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
            events: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryDocumentRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn get_latest_document(
        &self,
        canonical_url: &str,
    ) -> Result<Option<LatestDocument>, RepositoryError> {
        let documents = self
            .documents
            .read()
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        // Append-only store: the newest row for a URL is the last inserted
        Ok(documents
            .iter()
            .rev()
            .find(|stored| stored.document.canonical_url == canonical_url)
            .map(|stored| LatestDocument {
                id: stored.id.clone(),
                content_hash: stored.document.content_hash.clone(),
                retrieved_at: stored.document.retrieved_at,
                status: stored.document.status.clone(),
            }))
    }

    async fn insert_document(
        &self,
        document: &NewSourceDocument,
    ) -> Result<String, RepositoryError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        let id = format!("doc-{}", documents.len() + 1);
        documents.push(StoredDocument {
            id: id.clone(),
            document: document.clone(),
        });
        Ok(id)
    }

    async fn insert_change_event(
        &self,
        event: &NewChangeEvent,
    ) -> Result<String, RepositoryError> {
        let mut events = self
            .events
            .write()
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        let id = format!("event-{}", events.len() + 1);
        events.push((id.clone(), event.clone()));
        Ok(id)
    }
}
