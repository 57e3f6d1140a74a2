//! In-process vector index.
//!
//! Brute-force cosine similarity over every stored vector. Suitable for
//! local development and tests; nothing is persisted.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use docchat_core::{Error, Result, SearchFilter, SearchMatch, VectorIndex, VectorRecord};

use crate::metadata;

/// Cosine similarity of two vectors; 0.0 for mismatched or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Vector index held in memory.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    records: RwLock<HashMap<String, VectorRecord>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<SearchMatch>> {
        let records = self.records.read().await;

        let mut matches: Vec<SearchMatch> = records
            .values()
            .filter(|r| filter.map_or(true, |f| f.matches(&r.metadata)))
            .map(|r| SearchMatch {
                id: r.id.clone(),
                text: metadata::chunk_text(&r.metadata),
                score: cosine_similarity(query, &r.values),
                metadata: r.metadata.clone(),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(top_k);

        debug!(result_count = matches.len(), top_k, "In-memory search");
        Ok(matches)
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize> {
        let mut stored = self.records.write().await;
        if let Some(dim) = stored.values().next().map(|r| r.values.len()) {
            if let Some(bad) = records.iter().find(|r| r.values.len() != dim) {
                return Err(Error::Search(format!(
                    "Vector {} has dimension {}, index uses {}",
                    bad.id,
                    bad.values.len(),
                    dim
                )));
            }
        }

        let count = records.len();
        for record in records {
            stored.insert(record.id.clone(), record);
        }
        Ok(count)
    }

    async fn delete_by_file(&self, file_name: &str) -> Result<()> {
        let filter = SearchFilter::by_file(file_name);
        let mut stored = self.records.write().await;
        let before = stored.len();
        stored.retain(|_, r| !filter.matches(&r.metadata));
        debug!(
            file_name,
            removed = before - stored.len(),
            "Deleted vectors for file"
        );
        Ok(())
    }
}
