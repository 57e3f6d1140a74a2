//! Error types for docchat.

use thiserror::Error;

/// Result type alias using docchat's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for docchat operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A classifier response failed schema validation
    #[error("Malformed classifier output: {0}")]
    MalformedClassifierOutput(String),

    /// A PDF selection was requested against an empty or inconsistent set
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    /// A send/email action has no address from the classifier or memory
    #[error("No email address resolved: {0}")]
    NoAddressResolved(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Object storage operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Vector search operation failed
    #[error("Search error: {0}")]
    Search(String),

    /// Embedding generation failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Inference/generation failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// Outbound email delivery failed
    #[error("Email error: {0}")]
    Email(String),

    /// PDF rendering or text extraction failed
    #[error("Render error: {0}")]
    Render(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for failures of an external collaborator (storage, search,
    /// embeddings, LLM, email, rendering, network).
    ///
    /// These surface to the user as an apologetic chat message rather than
    /// an HTTP error.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::Storage(_)
                | Error::Search(_)
                | Error::Embedding(_)
                | Error::Inference(_)
                | Error::Email(_)
                | Error::Render(_)
                | Error::Request(_)
                | Error::Io(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
