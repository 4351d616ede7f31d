//! data.gov.au CKAN catalog fetcher
//!
//! Fetches dataset metadata via the CKAN `package_show` action and
//! canonicalizes it to sorted-key JSON before hashing, so key ordering in
//! the API response can never register as a change.

use async_trait::async_trait;
use regwatch_domain::{ContentFetcher, FetchError, FetchedContent};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

use super::{build_client, ensure_success};

const DATAGOV_CKAN_API: &str = "https://data.gov.au/api/3/action/package_show";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetcher for CKAN dataset metadata; the locator is a dataset id
pub struct CatalogFetcher {
    client: Client,
    api_url: String,
}

impl CatalogFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self::with_api_url(timeout, DATAGOV_CKAN_API.to_string())
    }

    pub fn with_api_url(timeout: Duration, api_url: String) -> Self {
        Self {
            client: build_client(timeout),
            api_url,
        }
    }
}

impl Default for CatalogFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl ContentFetcher for CatalogFetcher {
    async fn fetch(&self, locator: &str) -> Result<FetchedContent, FetchError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[("id", locator)])
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let response = ensure_success(response).await?;

        let payload: CkanResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Payload(e.to_string()))?;

        if !payload.success {
            return Err(FetchError::Payload(format!(
                "CKAN API returned success=false for dataset_id={}",
                locator
            )));
        }

        let result = payload.result.ok_or_else(|| {
            FetchError::Payload(format!("CKAN response missing result for dataset_id={}", locator))
        })?;

        let bytes = canonical_json_bytes(&result)
            .map_err(|e| FetchError::Payload(e.to_string()))?;

        let title = result
            .get("title")
            .and_then(Value::as_str)
            .map(String::from);

        let mut metadata = Map::new();
        metadata.insert("dataset_id".to_string(), Value::String(locator.to_string()));
        metadata.insert(
            "metadata_modified".to_string(),
            result.get("metadata_modified").cloned().unwrap_or(Value::Null),
        );
        metadata.insert(
            "resource_count".to_string(),
            Value::from(
                result
                    .get("resources")
                    .and_then(Value::as_array)
                    .map(Vec::len)
                    .unwrap_or(0),
            ),
        );

        Ok(FetchedContent {
            bytes,
            title,
            metadata,
        })
    }
}

#[derive(Deserialize)]
struct CkanResponse {
    success: bool,
    #[serde(default)]
    result: Option<Value>,
}

/// Serialize a JSON value with all object keys recursively sorted.
///
/// The explicit sort keeps the canonical form independent of map
/// implementation details in the JSON parser.
fn canonical_json_bytes(value: &Value) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&canonicalize(value))
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> = map
                .iter()
                .map(|(key, nested)| (key, canonicalize(nested)))
                .collect();
            Value::Object(
                sorted
                    .into_iter()
                    .map(|(key, nested)| (key.clone(), nested))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(server: &MockServer) -> CatalogFetcher {
        CatalogFetcher::with_api_url(
            DEFAULT_TIMEOUT,
            format!("{}/api/3/action/package_show", server.uri()),
        )
    }

    #[test]
    fn canonical_json_sorts_keys_recursively() {
        let value: Value = serde_json::from_str(
            r#"{"zeta": 1, "alpha": {"nested_b": 2, "nested_a": [ {"y": 1, "x": 2} ]}}"#,
        )
        .unwrap();
        let bytes = canonical_json_bytes(&value).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"alpha":{"nested_a":[{"x":2,"y":1}],"nested_b":2},"zeta":1}"#
        );
    }

    #[test]
    fn canonical_json_is_insensitive_to_key_order() {
        let a: Value = serde_json::from_str(r#"{"b": 1, "a": {"d": 3, "c": 4}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a": {"c": 4, "d": 3}, "b": 1}"#).unwrap();
        assert_eq!(
            canonical_json_bytes(&a).unwrap(),
            canonical_json_bytes(&b).unwrap()
        );
    }

    #[tokio::test]
    async fn fetch_canonicalizes_and_extracts_provenance() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/3/action/package_show"))
            .and(query_param("id", "visa-statistics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "result": {
                    "title": "Visa statistics",
                    "metadata_modified": "2024-07-01T00:00:00",
                    "resources": [{"format": "CSV"}, {"format": "XLSX"}]
                }
            })))
            .mount(&server)
            .await;

        let fetched = fetcher(&server).fetch("visa-statistics").await.unwrap();

        assert_eq!(fetched.title.as_deref(), Some("Visa statistics"));
        assert_eq!(
            fetched.metadata.get("dataset_id").and_then(Value::as_str),
            Some("visa-statistics")
        );
        assert_eq!(
            fetched
                .metadata
                .get("metadata_modified")
                .and_then(Value::as_str),
            Some("2024-07-01T00:00:00")
        );
        assert_eq!(
            fetched.metadata.get("resource_count").and_then(Value::as_u64),
            Some(2)
        );

        // Bytes are the canonical form of `result`, so they parse back to it
        let parsed: Value = serde_json::from_slice(&fetched.bytes).unwrap();
        assert_eq!(parsed.get("title").and_then(Value::as_str), Some("Visa statistics"));
    }

    #[tokio::test]
    async fn success_false_is_a_payload_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/3/action/package_show"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false
            })))
            .mount(&server)
            .await;

        let result = fetcher(&server).fetch("missing-dataset").await;

        match result {
            Err(FetchError::Payload(message)) => {
                assert!(message.contains("success=false"));
                assert!(message.contains("missing-dataset"));
            }
            other => panic!("expected payload error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn http_error_is_a_status_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/3/action/package_show"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = fetcher(&server).fetch("visa-statistics").await;
        assert!(matches!(result, Err(FetchError::Status { status: 503, .. })));
    }
}
