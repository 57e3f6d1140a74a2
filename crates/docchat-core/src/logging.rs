//! Structured logging field name constants for docchat.
//!
//! All crates use these constants for consistent structured logging fields
//! so log aggregation tools can query by one set of names.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events, completed actions |
//! | DEBUG | Decision points, intermediate values |
//! | TRACE | Per-item iteration (search hits, chunks) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated across a request. Format: UUIDv7.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "router", "dispatcher", "inference", "search", "store", "email"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
pub const COMPONENT: &str = "component";

/// Logical operation name.
pub const OPERATION: &str = "op";

// ─── Routing fields ────────────────────────────────────────────────────────

/// Classifier name ("email", "pdf_creation", "send_documents", ...).
pub const CLASSIFIER: &str = "classifier";

/// Action the router resolved.
pub const ACTION: &str = "action";

/// Whether the conversation contains generated PDFs.
pub const HAS_RECENT_PDFS: &str = "has_recent_pdfs";

pub const MENTIONS_SEND: &str = "mentions_send";

pub const MENTIONS_SOURCE: &str = "mentions_source";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Object-store key.
pub const STORAGE_KEY: &str = "storage_key";

/// Uploaded document name.
pub const FILE_NAME: &str = "file_name";

/// Search query text.
pub const QUERY: &str = "query";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search.
pub const RESULT_COUNT: &str = "result_count";

/// Number of chunks processed.
pub const CHUNK_COUNT: &str = "chunk_count";

/// Number of email attachments.
pub const ATTACHMENT_COUNT: &str = "attachment_count";

/// Number of history turns supplied with the request.
pub const HISTORY_LEN: &str = "history_len";

/// Byte length of a prompt.
pub const PROMPT_LEN: &str = "prompt_len";

/// Byte length of a model response.
pub const RESPONSE_LEN: &str = "response_len";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for inference.
pub const MODEL: &str = "model";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
