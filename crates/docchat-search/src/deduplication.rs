//! Grouping of chunk matches by source document.
//!
//! A top-k chunk search usually returns several chunks from the same
//! uploaded document. Flows that act on whole documents (emailing the
//! files behind a topic) need one entry per document instead.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use docchat_core::SearchMatch;

/// One uploaded document and the chunks of it that matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentHit {
    /// Object-store key of the document
    pub file_name: String,
    /// Score of the best-matching chunk
    pub best_score: f32,
    /// How many chunks of this document matched
    pub chunks_matched: usize,
    /// Matched chunks, best first
    pub chunks: Vec<SearchMatch>,
}

impl DocumentHit {
    /// Text of the best-matching chunk.
    pub fn best_text(&self) -> &str {
        self.chunks.first().map(|c| c.text.as_str()).unwrap_or_default()
    }
}

/// Group matches by `file_name`, best document first.
///
/// Matches without a `file_name` are dropped. Documents are ordered by
/// their best chunk score; ties keep first-seen order.
pub fn group_by_document(matches: Vec<SearchMatch>) -> Vec<DocumentHit> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<SearchMatch>> = HashMap::new();

    for m in matches {
        let Some(file_name) = m.file_name().map(str::to_string) else {
            continue;
        };
        if !groups.contains_key(&file_name) {
            order.push(file_name.clone());
        }
        groups.entry(file_name).or_default().push(m);
    }

    let mut hits: Vec<DocumentHit> = order
        .into_iter()
        .filter_map(|file_name| {
            let mut chunks = groups.remove(&file_name)?;
            chunks.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let best_score = chunks.first().map(|c| c.score)?;
            Some(DocumentHit {
                file_name,
                best_score,
                chunks_matched: chunks.len(),
                chunks,
            })
        })
        .collect();

    // Stable sort keeps first-seen order on ties
    hits.sort_by(|a, b| {
        b.best_score
            .partial_cmp(&a.best_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::chunk_metadata;
    use serde_json::Map;

    fn hit(file: &str, chunk: usize, score: f32) -> SearchMatch {
        SearchMatch {
            id: format!("{}_{}", file, chunk),
            text: format!("{} chunk {}", file, chunk),
            score,
            metadata: chunk_metadata(file, chunk, "", 1),
        }
    }

    #[test]
    fn test_empty_results() {
        assert!(group_by_document(vec![]).is_empty());
    }

    #[test]
    fn test_groups_and_keeps_best_score() {
        let grouped = group_by_document(vec![
            hit("pdfs/a.pdf", 0, 0.6),
            hit("pdfs/b.pdf", 0, 0.8),
            hit("pdfs/a.pdf", 1, 0.9),
        ]);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].file_name, "pdfs/a.pdf");
        assert_eq!(grouped[0].best_score, 0.9);
        assert_eq!(grouped[0].chunks_matched, 2);
        assert_eq!(grouped[0].best_text(), "pdfs/a.pdf chunk 1");
        assert_eq!(grouped[1].file_name, "pdfs/b.pdf");
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let grouped = group_by_document(vec![hit("pdfs/x.pdf", 0, 0.5), hit("pdfs/y.pdf", 0, 0.5)]);
        let names: Vec<_> = grouped.iter().map(|h| h.file_name.as_str()).collect();
        assert_eq!(names, vec!["pdfs/x.pdf", "pdfs/y.pdf"]);
    }

    #[test]
    fn test_matches_without_file_are_dropped() {
        let orphan = SearchMatch {
            id: "o".to_string(),
            text: "orphan".to_string(),
            score: 0.99,
            metadata: Map::new(),
        };
        let grouped = group_by_document(vec![orphan, hit("pdfs/a.pdf", 0, 0.1)]);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].file_name, "pdfs/a.pdf");
    }
}
