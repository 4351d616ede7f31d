//! Supabase REST document repository
//!
//! Talks to the PostgREST endpoint with the service role key, which
//! bypasses row-level security. Appropriate for server-side ingestion
//! workers only.

use async_trait::async_trait;
use regwatch_domain::{
    DocumentRepository, LatestDocument, NewChangeEvent, NewSourceDocument, RepositoryError,
};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Document repository backed by the Supabase REST API
pub struct RestDocumentRepository {
    client: Client,
    base_url: String,
    service_role_key: SecretString,
}

impl RestDocumentRepository {
    pub fn new(base_url: String, service_role_key: SecretString) -> Self {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_role_key,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let key = self.service_role_key.expose_secret();
        request
            .header("apikey", key)
            .header("Authorization", format!("Bearer {}", key))
            .header("Prefer", "return=representation")
    }

    async fn check_status(
        response: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response, RepositoryError> {
        let status = response.status();
        if status == 401 || status == 403 {
            return Err(RepositoryError::Auth(format!(
                "{}: HTTP {}",
                context, status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RepositoryError::Api(format!(
                "{}: HTTP {} - {}",
                context, status, body
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl DocumentRepository for RestDocumentRepository {
    async fn get_latest_document(
        &self,
        canonical_url: &str,
    ) -> Result<Option<LatestDocument>, RepositoryError> {
        let url_filter = format!("eq.{}", canonical_url);
        let response = self
            .authed(self.client.get(self.table_url("source_document")))
            .query(&[
                ("canonical_url", url_filter.as_str()),
                ("order", "retrieved_at.desc"),
                ("limit", "1"),
                ("select", "source_doc_id,content_hash,retrieved_at,status"),
            ])
            .send()
            .await
            .map_err(|e| RepositoryError::Network(e.to_string()))?;

        let response = Self::check_status(response, "get_latest_document").await?;

        let rows: Vec<DocumentRow> = response
            .json()
            .await
            .map_err(|e| RepositoryError::Api(e.to_string()))?;

        rows.into_iter()
            .next()
            .map(|row| {
                let retrieved_at = OffsetDateTime::parse(&row.retrieved_at, &Rfc3339)
                    .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
                Ok(LatestDocument {
                    id: row.source_doc_id,
                    content_hash: row.content_hash,
                    retrieved_at,
                    status: row.status,
                })
            })
            .transpose()
    }

    async fn insert_document(
        &self,
        document: &NewSourceDocument,
    ) -> Result<String, RepositoryError> {
        let retrieved_at = document
            .retrieved_at
            .format(&Rfc3339)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        let payload = DocumentPayload {
            source_type: document.source_type.as_str(),
            title: &document.title,
            canonical_url: &document.canonical_url,
            content_hash: &document.content_hash,
            raw_blob_uri: &document.raw_content_location,
            retrieved_at,
            metadata_json: &document.metadata,
            status: &document.status,
            effective_from: document.effective_from.as_deref(),
        };

        let response = self
            .authed(self.client.post(self.table_url("source_document")))
            .json(&payload)
            .send()
            .await
            .map_err(|e| RepositoryError::Network(e.to_string()))?;

        let response = Self::check_status(response, "insert_document").await?;

        let rows: Vec<InsertedDocument> = response
            .json()
            .await
            .map_err(|e| RepositoryError::Api(e.to_string()))?;

        rows.into_iter()
            .next()
            .map(|row| row.source_doc_id)
            .ok_or_else(|| {
                RepositoryError::Api("insert_document: empty representation".to_string())
            })
    }

    async fn insert_change_event(
        &self,
        event: &NewChangeEvent,
    ) -> Result<String, RepositoryError> {
        let payload = ChangeEventPayload {
            source_doc_id_new: &event.new_document_id,
            source_doc_id_old: event.old_document_id.as_deref(),
            change_type: event.change_type.as_str(),
            impact_score: event.impact_score,
            requires_review: event.requires_review,
            summary: &event.summary,
            affected_visa_ids: &event.affected_visa_ids,
        };

        let response = self
            .authed(self.client.post(self.table_url("change_event")))
            .json(&payload)
            .send()
            .await
            .map_err(|e| RepositoryError::Network(e.to_string()))?;

        let response = Self::check_status(response, "insert_change_event").await?;

        let rows: Vec<InsertedChangeEvent> = response
            .json()
            .await
            .map_err(|e| RepositoryError::Api(e.to_string()))?;

        rows.into_iter()
            .next()
            .map(|row| row.change_event_id)
            .ok_or_else(|| {
                RepositoryError::Api("insert_change_event: empty representation".to_string())
            })
    }
}

#[derive(Deserialize)]
struct DocumentRow {
    source_doc_id: String,
    content_hash: String,
    retrieved_at: String,
    status: String,
}

#[derive(Serialize)]
struct DocumentPayload<'a> {
    source_type: &'a str,
    title: &'a str,
    canonical_url: &'a str,
    content_hash: &'a str,
    raw_blob_uri: &'a str,
    retrieved_at: String,
    metadata_json: &'a Map<String, Value>,
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    effective_from: Option<&'a str>,
}

#[derive(Deserialize)]
struct InsertedDocument {
    source_doc_id: String,
}

#[derive(Serialize)]
struct ChangeEventPayload<'a> {
    source_doc_id_new: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_doc_id_old: Option<&'a str>,
    change_type: &'a str,
    impact_score: u8,
    requires_review: bool,
    summary: &'a str,
    affected_visa_ids: &'a [String],
}

#[derive(Deserialize)]
struct InsertedChangeEvent {
    change_event_id: String,
}
