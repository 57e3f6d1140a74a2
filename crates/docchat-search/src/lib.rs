//! # docchat-search
//!
//! Vector search for docchat.
//!
//! This crate provides:
//! - Pinecone-compatible REST index backend
//! - In-process cosine-similarity index for local runs and tests
//! - Grouping of chunk matches into per-document hits
//! - Chunk metadata key names shared by ingest and retrieval
//!
//! ## Example
//!
//! ```ignore
//! use docchat_search::{InMemoryVectorIndex, VectorIndex};
//!
//! let index = InMemoryVectorIndex::new();
//! index.upsert(records).await?;
//! let matches = index.search(&query_vector, 5, None).await?;
//! ```

pub mod deduplication;
pub mod memory;
pub mod metadata;
pub mod pinecone;

pub use docchat_core::*;

pub use deduplication::{group_by_document, DocumentHit};
pub use memory::{cosine_similarity, InMemoryVectorIndex};
pub use pinecone::{PineconeConfig, PineconeIndex};
