//! Centralized default constants for docchat.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers. Organized by domain area.

// =============================================================================
// CHUNKING
// =============================================================================

/// Target chunk size in tokens.
pub const CHUNK_TOKENS: usize = 400;

/// Overlap between adjacent chunks in tokens.
pub const CHUNK_OVERLAP_TOKENS: usize = 50;

/// Characters-per-token heuristic used when sizing chunks.
pub const CHARS_PER_TOKEN: usize = 4;

// =============================================================================
// RETRIEVAL
// =============================================================================

/// Default number of passages retrieved for a chat answer.
pub const TOP_K: usize = 5;

/// Passages retrieved when gathering documents to email.
pub const SEND_DOCS_TOP_K: usize = 10;

/// Passages retrieved when composing a content PDF.
pub const PDF_CONTENT_TOP_K: usize = 10;

/// Characters of each passage shown to the relevance filter.
pub const RELEVANCE_PREVIEW_CHARS: usize = 300;

/// Upper bound accepted for a client-supplied `top_k`.
pub const MAX_TOP_K: usize = 50;

// =============================================================================
// EMBEDDING
// =============================================================================

/// Default embedding model name (OpenAI).
pub const EMBED_MODEL: &str = "text-embedding-3-small";

/// Embedding dimension of `text-embedding-3-small`.
pub const EMBED_DIMENSION: usize = 1536;

/// Texts per embeddings request during ingestion.
pub const EMBED_BATCH_SIZE: usize = 64;

// =============================================================================
// INFERENCE
// =============================================================================

/// Default OpenAI-compatible endpoint.
pub const OPENAI_URL: &str = "https://api.openai.com/v1";

/// Default chat model.
pub const GEN_MODEL: &str = "gpt-4o-mini";

/// Timeout for embedding requests.
pub const EMBED_TIMEOUT_SECS: u64 = 30;

/// Timeout for generation requests.
pub const GEN_TIMEOUT_SECS: u64 = 120;

/// Max tokens for a classifier response.
pub const CLASSIFIER_MAX_TOKENS: u32 = 200;

/// Max tokens for topic extraction.
pub const TOPIC_MAX_TOKENS: u32 = 100;

/// Sampling for retrieval-grounded answers.
pub const ANSWER_TEMPERATURE: f32 = 0.3;
pub const ANSWER_MAX_TOKENS: u32 = 1500;

/// Sampling for conversation summaries.
pub const SUMMARY_TEMPERATURE: f32 = 0.7;
pub const SUMMARY_MAX_TOKENS: u32 = 2000;

// =============================================================================
// INTENT ROUTING
// =============================================================================

/// Exchanges of history shown to the email and PDF-creation classifiers.
pub const SHORT_HISTORY_EXCHANGES: usize = 3;

/// Exchanges of history shown to the send, bulk-send and source classifiers.
pub const LONG_HISTORY_EXCHANGES: usize = 5;

/// Trailing turns searched for a just-created PDF when the user asks to email "it".
pub const RECENT_PDF_TURNS: usize = 4;

/// PDFs referred to by "those" when no count is given.
pub const THOSE_SCOPE_DEFAULT_COUNT: i64 = 3;

// =============================================================================
// GENERATED PDFS
// =============================================================================

/// Longest topic fragment kept in a generated file name.
pub const PDF_TOPIC_MAX_CHARS: usize = 50;

/// File name of conversation summary PDFs.
pub const HISTORY_PDF_NAME: &str = "conversation_summary.pdf";

/// File name used when no topic could be extracted.
pub const CONTENT_PDF_FALLBACK_NAME: &str = "document_content.pdf";

/// Key prefix for uploaded documents.
pub const UPLOAD_PREFIX: &str = "pdfs/";

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP bind address.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 8000;

/// Default public base URL used in download links.
pub const BACKEND_URL: &str = "http://localhost:8000";

/// Default CORS origin (the Vite dev server).
pub const ALLOWED_ORIGINS: &str = "http://localhost:5173";

/// Preflight cache lifetime.
pub const CORS_MAX_AGE_SECS: u64 = 3600;

/// Maximum accepted upload size.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Default root directory of the filesystem object store.
pub const STORAGE_PATH: &str = "./data/objects";

/// Assistant persona name used in prompts.
pub const ASSISTANT_NAME: &str = "DocChat";

// =============================================================================
// EMAIL
// =============================================================================

/// SendGrid v3 API base.
pub const SENDGRID_URL: &str = "https://api.sendgrid.com/v3";

/// Timeout for outbound email requests.
pub const EMAIL_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// VECTOR SEARCH
// =============================================================================

/// Timeout for Pinecone requests.
pub const PINECONE_TIMEOUT_SECS: u64 = 30;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_windows_ordered() {
        assert!(SHORT_HISTORY_EXCHANGES < LONG_HISTORY_EXCHANGES);
    }

    #[test]
    fn test_chunk_overlap_smaller_than_chunk() {
        assert!(CHUNK_OVERLAP_TOKENS < CHUNK_TOKENS);
    }

    #[test]
    fn test_top_k_bounds() {
        assert!(TOP_K <= MAX_TOP_K);
        assert!(SEND_DOCS_TOP_K <= MAX_TOP_K);
        assert!(PDF_CONTENT_TOP_K <= MAX_TOP_K);
    }
}
