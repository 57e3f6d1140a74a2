//! OpenAI-compatible inference backend.
//!
//! Works with any endpoint that speaks the OpenAI chat-completions and
//! embeddings API (OpenAI, Azure OpenAI, vLLM, LocalAI, Ollama in
//! compatibility mode). Classifiers use the structured-output mode
//! (`response_format: json_schema`, strict).
//!
//! # Example
//!
//! ```rust,no_run
//! use docchat_inference::openai::OpenAIBackend;
//! use docchat_core::EmbeddingBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = OpenAIBackend::from_env().unwrap();
//!     let texts = vec!["Hello, world!".to_string()];
//!     let vectors = backend.embed_texts(&texts).await.unwrap();
//! }
//! ```

mod backend;
mod error;
mod types;

pub use backend::{
    OpenAIBackend, OpenAIConfig, DEFAULT_DIMENSION, DEFAULT_EMBED_MODEL, DEFAULT_GEN_MODEL,
    DEFAULT_OPENAI_URL, DEFAULT_TIMEOUT_SECS,
};
pub use error::{to_core_error, Endpoint, OpenAIErrorCode};
pub use types::*;
