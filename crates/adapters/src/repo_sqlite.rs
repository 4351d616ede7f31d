//! SQLite document repository implementation
//!
//! Local backend for offline runs and development. Mirrors the column
//! layout of the hosted store so summaries and provenance read the same
//! either way.

use async_trait::async_trait;
use regwatch_domain::{
    DocumentRepository, LatestDocument, NewChangeEvent, NewSourceDocument, RepositoryError,
};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

/// SQLite-backed document repository
pub struct SqliteDocumentRepository {
    pool: SqlitePool,
}

impl SqliteDocumentRepository {
    /// Create a new SQLite repository, initializing the database if needed
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RepositoryError::Database(format!("Failed to create directory: {}", e))
            })?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite repository (for testing)
    pub async fn in_memory() -> Result<Self, RepositoryError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS source_document (
                source_doc_id TEXT PRIMARY KEY,
                source_type TEXT NOT NULL,
                title TEXT NOT NULL,
                canonical_url TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                raw_blob_uri TEXT NOT NULL,
                retrieved_at TEXT NOT NULL,
                metadata_json TEXT NOT NULL,
                status TEXT NOT NULL,
                effective_from TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_source_document_latest
            ON source_document(canonical_url, retrieved_at)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS change_event (
                change_event_id TEXT PRIMARY KEY,
                source_doc_id_new TEXT NOT NULL,
                source_doc_id_old TEXT,
                change_type TEXT NOT NULL,
                impact_score INTEGER NOT NULL,
                requires_review INTEGER NOT NULL,
                summary TEXT NOT NULL,
                affected_visa_ids TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl DocumentRepository for SqliteDocumentRepository {
    async fn get_latest_document(
        &self,
        canonical_url: &str,
    ) -> Result<Option<LatestDocument>, RepositoryError> {
        let row: Option<(String, String, String, String)> = sqlx::query_as(
            r#"
            SELECT source_doc_id, content_hash, retrieved_at, status
            FROM source_document
            WHERE canonical_url = ?
            ORDER BY retrieved_at DESC
            LIMIT 1
            "#,
        )
        .bind(canonical_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        match row {
            Some((id, content_hash, retrieved_at_str, status)) => {
                let retrieved_at = OffsetDateTime::parse(&retrieved_at_str, &Rfc3339)
                    .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

                Ok(Some(LatestDocument {
                    id,
                    content_hash,
                    retrieved_at,
                    status,
                }))
            }
            None => Ok(None),
        }
    }

    async fn insert_document(
        &self,
        document: &NewSourceDocument,
    ) -> Result<String, RepositoryError> {
        let id = Uuid::new_v4().to_string();
        let retrieved_at = document
            .retrieved_at
            .format(&Rfc3339)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        let metadata_json = serde_json::to_string(&document.metadata)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO source_document
            (source_doc_id, source_type, title, canonical_url, content_hash,
             raw_blob_uri, retrieved_at, metadata_json, status, effective_from)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(document.source_type.as_str())
        .bind(&document.title)
        .bind(&document.canonical_url)
        .bind(&document.content_hash)
        .bind(&document.raw_content_location)
        .bind(&retrieved_at)
        .bind(&metadata_json)
        .bind(&document.status)
        .bind(&document.effective_from)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(id)
    }

    async fn insert_change_event(
        &self,
        event: &NewChangeEvent,
    ) -> Result<String, RepositoryError> {
        let id = Uuid::new_v4().to_string();
        let affected = serde_json::to_string(&event.affected_visa_ids)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO change_event
            (change_event_id, source_doc_id_new, source_doc_id_old, change_type,
             impact_score, requires_review, summary, affected_visa_ids)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&event.new_document_id)
        .bind(&event.old_document_id)
        .bind(event.change_type.as_str())
        .bind(event.impact_score as i64)
        .bind(event.requires_review)
        .bind(&event.summary)
        .bind(&affected)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(id)
    }
}
