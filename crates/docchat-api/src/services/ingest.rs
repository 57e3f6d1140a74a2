//! Uploaded document lifecycle: store, extract, chunk, embed, index.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use docchat_core::defaults::{
    CHARS_PER_TOKEN, CHUNK_OVERLAP_TOKENS, CHUNK_TOKENS, EMBED_BATCH_SIZE, UPLOAD_PREFIX,
};
use docchat_core::{
    EmbeddingBackend, Error, ObjectStore, Result, StoredObject, VectorIndex, VectorRecord,
    PDF_TIMESTAMP_FORMAT,
};
use docchat_search::metadata::chunk_metadata;

/// One window of document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    /// Estimated token count
    pub token_count: usize,
}

/// Fixed-size windows with overlap, measured in estimated tokens.
///
/// Window edges are moved back to the nearest whitespace so words are not
/// split; a window with no whitespace is cut at a char boundary.
#[derive(Debug, Clone, Copy)]
pub struct WindowChunker {
    max_chars: usize,
    overlap_chars: usize,
}

impl Default for WindowChunker {
    fn default() -> Self {
        Self::new(CHUNK_TOKENS, CHUNK_OVERLAP_TOKENS)
    }
}

impl WindowChunker {
    pub fn new(chunk_tokens: usize, overlap_tokens: usize) -> Self {
        let max_chars = (chunk_tokens * CHARS_PER_TOKEN).max(1);
        Self {
            max_chars,
            overlap_chars: (overlap_tokens * CHARS_PER_TOKEN).min(max_chars / 2),
        }
    }

    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < text.len() {
            let mut end = boundary_before(text, (start + self.max_chars).min(text.len()));
            if end < text.len() {
                if let Some(space) = text[start..end].rfind(char::is_whitespace) {
                    if space > 0 {
                        end = start + space;
                    }
                }
            }
            if end <= start {
                end = boundary_after(text, start + 1);
            }

            let piece = text[start..end].trim();
            if !piece.is_empty() {
                chunks.push(TextChunk {
                    text: piece.to_string(),
                    token_count: piece.chars().count().div_ceil(CHARS_PER_TOKEN),
                });
            }
            if end >= text.len() {
                break;
            }

            let next = boundary_after(text, end.saturating_sub(self.overlap_chars));
            // skip to the start of the next word inside the overlap
            let next = match text[next..end].find(char::is_whitespace) {
                Some(ws) if next > start => boundary_after(text, next + ws + 1),
                _ => next,
            };
            start = if next > start { next } else { end };
        }
        chunks
    }
}

fn boundary_before(text: &str, mut pos: usize) -> usize {
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

fn boundary_after(text: &str, mut pos: usize) -> usize {
    while pos < text.len() && !text.is_char_boundary(pos) {
        pos += 1;
    }
    pos.min(text.len())
}

/// Extract text from PDF bytes, dropping blank lines.
pub async fn extract_pdf_text(bytes: Vec<u8>) -> Result<String> {
    let extracted = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| Error::InvalidInput(format!("PDF text extraction aborted: {}", e)))?
        .map_err(|e| Error::InvalidInput(format!("Could not read PDF: {}", e)))?;

    Ok(extracted
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Keep letters, digits, `.`, `-` and `_`; everything else becomes `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches(['_', '.']).is_empty() {
        "document.pdf".to_string()
    } else {
        cleaned
    }
}

/// `pdfs/{YYYYMMDD_HHMMSS}_{name}` for a new upload.
pub fn upload_key(file_name: &str) -> String {
    format!(
        "{}{}_{}",
        UPLOAD_PREFIX,
        Utc::now().format(PDF_TIMESTAMP_FORMAT),
        sanitize_file_name(file_name)
    )
}

/// Result of indexing one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub storage_key: String,
    pub chunk_count: usize,
}

/// Owns the upload, list and delete flows for uploaded documents.
pub struct DocumentIngestor {
    embeddings: Arc<dyn EmbeddingBackend>,
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn ObjectStore>,
    chunker: WindowChunker,
}

impl DocumentIngestor {
    pub fn new(
        embeddings: Arc<dyn EmbeddingBackend>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            embeddings,
            index,
            store,
            chunker: WindowChunker::default(),
        }
    }

    /// Store an uploaded PDF and index its text.
    pub async fn ingest_pdf(&self, file_name: &str, bytes: Vec<u8>) -> Result<IngestOutcome> {
        let start = Instant::now();
        let text = extract_pdf_text(bytes.clone()).await?;
        if text.is_empty() {
            return Err(Error::InvalidInput(
                "No extractable text found in PDF".to_string(),
            ));
        }

        let key = upload_key(file_name);
        self.store.put(&key, &bytes, HashMap::new()).await?;

        let chunk_count = match self.index_text(&key, &text).await {
            Ok(n) => n,
            Err(e) => {
                warn!(storage_key = %key, error = %e, "Indexing failed, removing stored upload");
                if let Err(cleanup) = self.store.delete(&key).await {
                    warn!(storage_key = %key, error = %cleanup, "Failed to remove upload");
                }
                return Err(e);
            }
        };

        info!(
            storage_key = %key,
            chunk_count,
            duration_ms = start.elapsed().as_millis() as u64,
            "Ingested document"
        );
        Ok(IngestOutcome {
            storage_key: key,
            chunk_count,
        })
    }

    /// Chunk, embed and upsert `text` under document `key`.
    pub async fn index_text(&self, key: &str, text: &str) -> Result<usize> {
        let chunks = self.chunker.chunk(text);
        let mut records = Vec::with_capacity(chunks.len());

        for (batch_index, batch) in chunks.chunks(EMBED_BATCH_SIZE).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embeddings.embed_texts(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(Error::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            for (offset, (chunk, values)) in batch.iter().zip(vectors).enumerate() {
                let chunk_id = batch_index * EMBED_BATCH_SIZE + offset;
                records.push(VectorRecord {
                    id: format!("{}_{}", key, chunk_id),
                    values,
                    metadata: chunk_metadata(key, chunk_id, &chunk.text, chunk.token_count),
                });
            }
            debug!(storage_key = %key, batch = batch_index, "Embedded chunk batch");
        }

        self.index.upsert(records).await
    }

    /// Uploaded documents, newest first.
    pub async fn list(&self) -> Result<Vec<StoredObject>> {
        let mut objects: Vec<StoredObject> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|o| o.key.starts_with(UPLOAD_PREFIX))
            .collect();
        objects.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(objects)
    }

    /// Remove a document's vectors and then the document itself.
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.index.delete_by_file(key).await?;
        self.store.delete(key).await?;
        info!(storage_key = %key, "Deleted document");
        Ok(())
    }
}
