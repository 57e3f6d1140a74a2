//! # docchat-store
//!
//! Object storage for docchat.
//!
//! Uploaded documents live under `pdfs/` and generated reports under
//! `generated_pdfs/`. The filesystem backend keeps each object's string
//! metadata in a `.meta.json` sidecar next to it.
//!
//! ## Example
//!
//! ```rust,ignore
//! use docchat_core::ObjectStore;
//! use docchat_store::FilesystemStore;
//!
//! let store = FilesystemStore::new("/var/docchat/objects");
//! store.validate().await?;
//! store.put("pdfs/report.pdf", &bytes, HashMap::new()).await?;
//! ```

pub mod filesystem;

pub use filesystem::{validate_key, FilesystemStore, METADATA_SUFFIX};
