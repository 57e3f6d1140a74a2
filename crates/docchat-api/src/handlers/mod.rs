//! HTTP handlers for docchat-api.

pub mod chat;
pub mod health;
pub mod pdfs;
pub mod rag;
