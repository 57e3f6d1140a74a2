//! Pinecone REST index backend.
//!
//! Talks to a single index host (`https://<index>-<project>.svc.<env>.pinecone.io`)
//! with the data-plane endpoints `/query`, `/vectors/upsert` and
//! `/vectors/delete`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use std::time::Duration;
use tracing::{debug, info, warn};

use docchat_core::defaults;
use docchat_core::{Error, Result, SearchFilter, SearchMatch, VectorIndex, VectorRecord};

use crate::metadata;

/// Vectors per upsert request.
pub const UPSERT_BATCH_SIZE: usize = 100;

/// Upper bound Pinecone accepts for `topK`; used to enumerate a file's vectors.
pub const MAX_QUERY_TOP_K: usize = 10_000;

/// Configuration for [`PineconeIndex`].
#[derive(Debug, Clone)]
pub struct PineconeConfig {
    pub api_key: String,
    /// Data-plane host of the index, with scheme.
    pub index_host: String,
    pub namespace: Option<String>,
    /// Index dimension; needed to build the probe vector for deletes.
    pub dimension: usize,
    pub timeout_seconds: u64,
}

impl PineconeConfig {
    /// Read `PINECONE_*` variables. `None` unless both the key and the
    /// index host are set.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("PINECONE_API_KEY").ok().filter(|s| !s.is_empty())?;
        let index_host = std::env::var("PINECONE_INDEX_HOST")
            .ok()
            .filter(|s| !s.is_empty())?;
        let index_host = if index_host.starts_with("http") {
            index_host
        } else {
            format!("https://{}", index_host)
        };

        Some(Self {
            api_key,
            index_host,
            namespace: std::env::var("PINECONE_NAMESPACE")
                .ok()
                .filter(|s| !s.is_empty()),
            dimension: std::env::var("OPENAI_EMBED_DIM")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::EMBED_DIMENSION),
            timeout_seconds: std::env::var("PINECONE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::PINECONE_TIMEOUT_SECS),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, JsonValue>>,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

/// Pinecone-hosted vector index.
pub struct PineconeIndex {
    client: Client,
    config: PineconeConfig,
}

impl PineconeIndex {
    pub fn new(config: PineconeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Search(format!("Failed to create HTTP client: {}", e)))?;

        info!(host = %config.index_host, dimension = config.dimension, "Initializing Pinecone index");
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &PineconeConfig {
        &self.config
    }

    fn filter_json(filter: &SearchFilter) -> Option<JsonValue> {
        filter
            .file_name
            .as_ref()
            .map(|f| json!({ "file_name": { "$eq": f } }))
    }

    async fn post<B: Serialize + ?Sized, R: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}{}", self.config.index_host.trim_end_matches('/'), path);
        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Search(format!("Request to {} failed: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, path, "Pinecone request failed");
            return Err(Error::Search(format!(
                "Pinecone {} returned {}: {}",
                path, status, text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Search(format!("Failed to parse {} response: {}", path, e)))
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<QueryMatch>> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            filter: filter.and_then(Self::filter_json),
            namespace: self.config.namespace.as_deref(),
        };
        let response: QueryResponse = self.post("/query", &request).await?;
        Ok(response.matches)
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<SearchMatch>> {
        let matches = self.query(query, top_k, filter).await?;
        debug!(result_count = matches.len(), top_k, "Pinecone query");

        Ok(matches
            .into_iter()
            .map(|m| {
                let metadata = m.metadata.unwrap_or_default();
                SearchMatch {
                    id: m.id,
                    text: metadata::chunk_text(&metadata),
                    score: m.score,
                    metadata,
                }
            })
            .collect())
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize> {
        let mut total = 0;
        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            let request = UpsertRequest {
                vectors: batch,
                namespace: self.config.namespace.as_deref(),
            };
            let response: UpsertResponse = self.post("/vectors/upsert", &request).await?;
            total += response.upserted_count;
        }
        info!(upserted = total, "Upserted vectors to Pinecone");
        Ok(total)
    }

    /// Serverless indexes cannot delete by metadata filter, so the file's
    /// vector ids are enumerated with a filtered query first.
    async fn delete_by_file(&self, file_name: &str) -> Result<()> {
        let probe = vec![0.0; self.config.dimension];
        let filter = SearchFilter::by_file(file_name);
        let ids: Vec<String> = self
            .query(&probe, MAX_QUERY_TOP_K, Some(&filter))
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();

        if ids.is_empty() {
            warn!(file_name, "No vectors found for file");
            return Ok(());
        }

        for batch in ids.chunks(UPSERT_BATCH_SIZE * 10) {
            let request = DeleteRequest {
                ids: batch,
                namespace: self.config.namespace.as_deref(),
            };
            let _: JsonValue = self.post("/vectors/delete", &request).await?;
        }
        info!(file_name, deleted = ids.len(), "Deleted vectors from Pinecone");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_json() {
        let filter = SearchFilter::by_file("pdfs/a.pdf");
        assert_eq!(
            PineconeIndex::filter_json(&filter),
            Some(json!({"file_name": {"$eq": "pdfs/a.pdf"}}))
        );
        assert_eq!(PineconeIndex::filter_json(&SearchFilter::default()), None);
    }

    #[test]
    fn test_query_request_serializes_camel_case() {
        let request = QueryRequest {
            vector: &[0.5],
            top_k: 3,
            include_metadata: true,
            filter: None,
            namespace: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({"vector": [0.5], "topK": 3, "includeMetadata": true}));
    }
}
