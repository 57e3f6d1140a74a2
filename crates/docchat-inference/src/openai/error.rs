//! OpenAI-specific error handling.

use docchat_core::Error;

/// OpenAI-specific error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAIErrorCode {
    /// Invalid authentication credentials.
    AuthenticationError,
    /// Rate limit exceeded.
    RateLimitExceeded,
    /// Model not found or not available.
    ModelNotFound,
    /// Request too large.
    ContextLengthExceeded,
    /// Server error.
    ServerError,
    /// Unknown error.
    Unknown,
}

impl OpenAIErrorCode {
    /// Determine error code from HTTP status and error type.
    pub fn from_response(status: u16, error_type: &str) -> Self {
        match (status, error_type) {
            (401, _) | (403, _) => Self::AuthenticationError,
            (429, _) => Self::RateLimitExceeded,
            (404, _) | (_, "model_not_found") => Self::ModelNotFound,
            (400, _) if error_type.contains("context_length") => Self::ContextLengthExceeded,
            (500..=599, _) => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimitExceeded | Self::ServerError)
    }

    fn describe(&self, message: &str) -> String {
        match self {
            Self::AuthenticationError => format!("Authentication failed: {}", message),
            Self::RateLimitExceeded => format!("Rate limit exceeded: {}", message),
            Self::ModelNotFound => format!("Model not found: {}", message),
            Self::ContextLengthExceeded => format!("Context too long: {}", message),
            Self::ServerError => format!("Server error: {}", message),
            Self::Unknown => message.to_string(),
        }
    }
}

/// Which endpoint an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Chat,
    Embeddings,
}

/// Convert an OpenAI error into a docchat error. Every provider failure is
/// an upstream failure of the endpoint that produced it.
pub fn to_core_error(endpoint: Endpoint, code: OpenAIErrorCode, message: &str) -> Error {
    let text = code.describe(message);
    match endpoint {
        Endpoint::Chat => Error::Inference(text),
        Endpoint::Embeddings => Error::Embedding(text),
    }
}
