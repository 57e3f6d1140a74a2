//! Core traits for docchat abstractions.
//!
//! These traits define the interfaces of the external collaborators
//! (LLM, embeddings, vector search, object storage, email, PDF rendering),
//! enabling pluggable backends and testability.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Backend for generating embeddings.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate embeddings for the given texts.
    ///
    /// Returns a vector of embedding vectors, one per input text.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vector> {
        let mut vectors = self.embed_texts(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| crate::Error::Embedding("Backend returned no embedding".to_string()))
    }

    /// Get the expected dimension of embedding vectors.
    fn dimension(&self) -> usize;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// Backend for text generation (LLM).
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Run a chat completion and return the assistant text.
    async fn complete(&self, messages: &[PromptMessage], options: CompletionOptions)
        -> Result<String>;

    /// Run a chat completion constrained to the given JSON schema and return
    /// the parsed JSON object. Shape validation is the caller's job.
    async fn complete_structured(
        &self,
        messages: &[PromptMessage],
        schema: &StructuredSchema,
    ) -> Result<JsonValue>;

    /// Generate text with system context.
    async fn generate_with_system(
        &self,
        system: &str,
        prompt: &str,
        options: CompletionOptions,
    ) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if !system.is_empty() {
            messages.push(PromptMessage::system(system));
        }
        messages.push(PromptMessage::user(prompt));
        self.complete(&messages, options).await
    }

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

// =============================================================================
// SEARCH TRAITS
// =============================================================================

/// Vector similarity search over indexed document chunks.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Top-k nearest chunks, best first.
    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<SearchMatch>>;

    /// Insert or replace chunk vectors.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize>;

    /// Remove every chunk that belongs to the given document.
    async fn delete_by_file(&self, file_name: &str) -> Result<()>;
}

// =============================================================================
// STORAGE TRAITS
// =============================================================================

/// Object storage for uploaded documents and generated PDFs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store bytes under `key` with string metadata, returning the key.
    async fn put(&self, key: &str, data: &[u8], metadata: HashMap<String, String>)
        -> Result<String>;

    /// Read an object's bytes.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Delete an object (missing objects are not an error).
    async fn delete(&self, key: &str) -> Result<()>;

    /// Read an object's metadata without its body.
    async fn head_metadata(&self, key: &str) -> Result<HashMap<String, String>>;

    /// List every stored object.
    async fn list(&self) -> Result<Vec<StoredObject>>;
}

// =============================================================================
// DELIVERY TRAITS
// =============================================================================

/// Outbound email delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        attachments: Vec<EmailAttachment>,
    ) -> Result<()>;
}

/// PDF report rendering.
pub trait PdfRenderer: Send + Sync {
    /// Render a titled report with an optional list of source documents.
    fn render_report(&self, title: &str, body: &str, source_documents: &[String])
        -> Result<Vec<u8>>;
}
