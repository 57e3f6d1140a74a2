//! # docchat-core
//!
//! Core types, traits, and conversation extractors for docchat.
//!
//! This crate provides the data structures, collaborator traits and pure
//! conversation-state helpers that the other docchat crates depend on.

pub mod defaults;
pub mod error;
pub mod extract;
pub mod logging;
pub mod models;
pub mod pdf_index;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use extract::{
    contains_email, download_marker, extract_generated_pdfs, extract_last_n_count,
    extract_most_recent_email, is_address_prompt, is_valid_email, mentions_send,
    mentions_source,
};
pub use models::*;
pub use pdf_index::{select_by_policy, select_by_scope, ConversationPdfIndex};
pub use traits::*;
