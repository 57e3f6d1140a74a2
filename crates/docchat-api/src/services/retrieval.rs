//! Retrieval and citation helpers shared by the chat and PDF flows.
//!
//! Retrieved chunks are shown to the model labelled `[Source: name]`,
//! where `name` is the document's file name without directory or `.pdf`
//! extension. The model is asked to end its answer with a
//! `SOURCES_USED: a, b` line naming the labels it relied on; that line is
//! stripped from the reply and used to filter the reported sources.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use docchat_core::{
    display_name, EmbeddingBackend, Result, SearchFilter, SearchMatch, SourceRef, VectorIndex,
};

/// Marker line the model appends to name the sources it used.
pub const SOURCES_USED_MARKER: &str = "SOURCES_USED:";

/// Marker line the relevance filter answers with.
pub const RELEVANT_DOCS_MARKER: &str = "RELEVANT_DOCS:";

/// Context text used when nothing was retrieved.
pub const NO_CONTEXT: &str = "No relevant documents found in the knowledge base.";

static SOURCES_USED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^[*\s]*SOURCES_USED:[ \t]*(.*)$").unwrap());

static RELEVANT_DOCS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)RELEVANT_DOCS:[ \t]*(.*)$").unwrap());

/// Embeds a query and searches the vector index.
pub struct Retriever {
    embeddings: Arc<dyn EmbeddingBackend>,
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    pub fn new(embeddings: Arc<dyn EmbeddingBackend>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embeddings, index }
    }

    /// Top-k chunks for `query`, optionally restricted to one document.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        file_filter: Option<&str>,
    ) -> Result<Vec<SearchMatch>> {
        let start = Instant::now();
        let vector = self.embeddings.embed(query).await?;
        let filter = file_filter.map(SearchFilter::by_file);
        let matches = self.index.search(&vector, top_k, filter.as_ref()).await?;

        debug!(
            query_len = query.len(),
            top_k,
            file_filter = file_filter.unwrap_or(""),
            result_count = matches.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Retrieved chunks"
        );
        Ok(matches)
    }
}

/// `pdfs/20250101_120000_Alex_Resume.pdf` → `20250101_120000_Alex_Resume`.
pub fn simple_name(file_name: &str) -> String {
    let name = display_name(file_name);
    name.strip_suffix(".pdf")
        .or_else(|| name.strip_suffix(".PDF"))
        .unwrap_or(name)
        .to_string()
}

/// Retrieved chunks as labelled context blocks.
pub fn labelled_context(matches: &[SearchMatch]) -> String {
    if matches.is_empty() {
        return NO_CONTEXT.to_string();
    }
    matches
        .iter()
        .map(|m| match m.file_name() {
            Some(file) => format!("[Source: {}]\n{}", simple_name(file), m.text),
            None => m.text.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Split a `NAME: a, b.` list into trimmed names.
fn split_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().trim_end_matches('.').trim().to_string())
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("none"))
        .collect()
}

/// Remove the `SOURCES_USED:` line from an answer.
///
/// Returns the cleaned answer and the named sources, or `None` when the
/// model did not include the line.
pub fn split_sources_used(answer: &str) -> (String, Option<Vec<String>>) {
    let Some(caps) = SOURCES_USED_RE.captures(answer) else {
        return (answer.trim().to_string(), None);
    };
    let names = split_names(caps.get(1).map(|m| m.as_str()).unwrap_or_default());
    let cleaned = SOURCES_USED_RE.replace_all(answer, "").trim().to_string();
    (cleaned, Some(names))
}

/// Names listed after `RELEVANT_DOCS:`, or `None` when the marker is missing.
pub fn parse_relevant_docs(text: &str) -> Option<Vec<String>> {
    RELEVANT_DOCS_RE
        .captures(text)
        .map(|caps| split_names(caps.get(1).map(|m| m.as_str()).unwrap_or_default()))
}

/// Source references for the matches whose document was named.
///
/// `None` (model gave no list) reports nothing; names are compared on the
/// simple name, case-insensitively.
pub fn cited_sources(matches: &[SearchMatch], named: Option<&[String]>) -> Vec<SourceRef> {
    let Some(named) = named else {
        return Vec::new();
    };
    let wanted: HashSet<String> = named.iter().map(|n| n.to_lowercase()).collect();

    matches
        .iter()
        .filter_map(|m| {
            let file = m.file_name()?;
            wanted
                .contains(&simple_name(file).to_lowercase())
                .then(|| SourceRef {
                    file_name: file.to_string(),
                    chunk_id: m.chunk_id(),
                    relevance_score: m.score,
                })
        })
        .collect()
}

/// Distinct document keys of the cited sources, in first-cited order.
pub fn cited_documents(sources: &[SourceRef]) -> Vec<String> {
    let mut seen = HashSet::new();
    sources
        .iter()
        .filter(|s| seen.insert(s.file_name.clone()))
        .map(|s| s.file_name.clone())
        .collect()
}
