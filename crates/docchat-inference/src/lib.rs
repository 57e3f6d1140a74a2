//! # docchat-inference
//!
//! Model backends for docchat.
//!
//! This crate provides:
//! - OpenAI-compatible embedding and chat completion backend (feature `openai`)
//! - Structured-output intent classifiers built on any [`GenerationBackend`]
//! - A scripted mock backend for tests (feature `mock`)
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use docchat_inference::{ClassificationContext, IntentClassifiers, OpenAIBackend};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = Arc::new(OpenAIBackend::from_env().unwrap());
//!     let classifiers = IntentClassifiers::from_backend(backend);
//!     let ctx = ClassificationContext::new("email me the last PDF", &[]);
//!     let intent = classifiers.email.classify_or_default(&ctx).await;
//!     println!("{:?}", intent);
//! }
//! ```

pub mod classifiers;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use docchat_core::*;

pub use classifiers::{
    BulkSendPrompt, ClassificationContext, Classifier, EmailIntentPrompt, IntentClassifiers,
    IntentPrompt, PdfCreationPrompt, PromptClassifier, SendDocumentsPrompt, SendSourcesPrompt,
};

#[cfg(feature = "openai")]
pub use openai::{OpenAIBackend, OpenAIConfig};

#[cfg(any(test, feature = "mock"))]
pub use mock::MockInferenceBackend;
