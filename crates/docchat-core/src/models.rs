//! Core data models for docchat.
//!
//! These types are shared across all docchat crates and represent the
//! conversation, intent, and collaborator-facing domain entities.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Embedding vector.
pub type Vector = Vec<f32>;

/// Format of the sortable timestamp token embedded in generated PDF keys.
pub const PDF_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// =============================================================================
// CONVERSATION TYPES
// =============================================================================

/// Author of a conversation turn or prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Label used when serializing history into classifier prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One message of the conversation log sent by the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

/// A message sent to the completion backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

impl From<&ConversationTurn> for PromptMessage {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            role: turn.role,
            content: turn.content.clone(),
        }
    }
}

/// Sampling options for a completion request.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionOptions {
    /// Deterministic settings used for classification-style calls.
    pub fn deterministic(max_tokens: u32) -> Self {
        Self {
            temperature: Some(0.0),
            max_tokens: Some(max_tokens),
        }
    }

    pub fn creative(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature: Some(temperature),
            max_tokens: Some(max_tokens),
        }
    }
}

/// Declared JSON schema for structured-output completions.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredSchema {
    pub name: String,
    pub schema: JsonValue,
}

// =============================================================================
// GENERATED PDF TYPES
// =============================================================================

/// Kind of content a generated PDF was rendered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdfKind {
    /// Summary of the conversation itself
    History,
    /// Answer generated from retrieved document content
    VectorContent,
}

impl PdfKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfKind::History => "history",
            PdfKind::VectorContent => "vector_content",
        }
    }
}

impl fmt::Display for PdfKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PdfKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "history" => Ok(Self::History),
            "vector_content" => Ok(Self::VectorContent),
            _ => Err(format!("Invalid PDF kind: {}", s)),
        }
    }
}

/// A PDF generated earlier in the conversation, recovered from an assistant
/// turn's download link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPdfRecord {
    /// Object-store key, e.g. `generated_pdfs/20251209_195408_report.pdf`
    pub storage_key: String,
    /// `YYYYMMDD_HHMMSS` token; lexicographic order is creation order
    pub timestamp: String,
    /// Last path segment of the key
    pub file_name: String,
}

/// Metadata the PDF generator attaches to every generated PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfMetadata {
    pub created_at: DateTime<Utc>,
    pub kind: PdfKind,
    /// Object-store keys of the uploaded documents the PDF was built from,
    /// in first-use order without duplicates
    pub source_document_keys: Vec<String>,
}

impl PdfMetadata {
    pub const KEY_GENERATED_AT: &'static str = "generated_at";
    pub const KEY_TYPE: &'static str = "type";
    pub const KEY_SOURCE_DOCUMENTS: &'static str = "source_documents";

    pub fn new(created_at: DateTime<Utc>, kind: PdfKind, sources: Vec<String>) -> Self {
        let mut source_document_keys: Vec<String> = Vec::with_capacity(sources.len());
        for key in sources {
            if !key.is_empty() && !source_document_keys.contains(&key) {
                source_document_keys.push(key);
            }
        }
        Self {
            created_at,
            kind,
            source_document_keys,
        }
    }

    /// Timestamp token used both in the storage key and `generated_at`.
    pub fn timestamp_token(&self) -> String {
        self.created_at.format(PDF_TIMESTAMP_FORMAT).to_string()
    }

    /// Flatten into the object store's string metadata map.
    pub fn to_storage_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(Self::KEY_GENERATED_AT.to_string(), self.timestamp_token());
        map.insert(Self::KEY_TYPE.to_string(), self.kind.as_str().to_string());
        map.insert(
            Self::KEY_SOURCE_DOCUMENTS.to_string(),
            self.source_document_keys.join(","),
        );
        map
    }

    /// Parse the object store's metadata map.
    pub fn from_storage_map(map: &HashMap<String, String>) -> Result<Self> {
        let generated_at = map.get(Self::KEY_GENERATED_AT).ok_or_else(|| {
            Error::Serialization("PDF metadata missing generated_at".to_string())
        })?;
        let naive = NaiveDateTime::parse_from_str(generated_at, PDF_TIMESTAMP_FORMAT)
            .map_err(|e| Error::Serialization(format!("Invalid generated_at: {}", e)))?;
        let kind = map
            .get(Self::KEY_TYPE)
            .ok_or_else(|| Error::Serialization("PDF metadata missing type".to_string()))?
            .parse::<PdfKind>()
            .map_err(Error::Serialization)?;

        Ok(Self::new(
            Utc.from_utc_datetime(&naive),
            kind,
            Self::source_documents_from(map),
        ))
    }

    /// Source document keys from a metadata map, tolerating absent or
    /// partial metadata.
    pub fn source_documents_from(map: &HashMap<String, String>) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        if let Some(raw) = map.get(Self::KEY_SOURCE_DOCUMENTS) {
            for key in raw.split(',').map(str::trim).filter(|k| !k.is_empty()) {
                if !keys.iter().any(|k| k == key) {
                    keys.push(key.to_string());
                }
            }
        }
        keys
    }
}

// =============================================================================
// INTENT TYPES
// =============================================================================

/// What the PDF-creation classifier concluded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdfRequestKind {
    History,
    VectorContent,
    #[default]
    Chat,
}

impl PdfRequestKind {
    pub fn pdf_kind(&self) -> Option<PdfKind> {
        match self {
            PdfRequestKind::History => Some(PdfKind::History),
            PdfRequestKind::VectorContent => Some(PdfKind::VectorContent),
            PdfRequestKind::Chat => None,
        }
    }
}

/// Which previously generated PDFs a bulk send targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdfSelection {
    #[default]
    All,
    LastN,
    Last,
}

impl PdfSelection {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfSelection::All => "all",
            PdfSelection::LastN => "last_n",
            PdfSelection::Last => "last",
        }
    }
}

/// Which generated PDFs a source-documents request refers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceScope {
    #[default]
    All,
    LastPdf,
    Those,
    LastNPdfs,
}

impl SourceScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceScope::All => "all",
            SourceScope::LastPdf => "last_pdf",
            SourceScope::Those => "those",
            SourceScope::LastNPdfs => "last_n_pdfs",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailIntent {
    pub wants_email: bool,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfCreationIntent {
    pub wants_pdf: bool,
    pub kind: PdfRequestKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendDocumentsIntent {
    pub wants_send_docs: bool,
    pub address: Option<String>,
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkSendIntent {
    pub wants_bulk_send: bool,
    pub address: Option<String>,
    pub selection: PdfSelection,
    pub count: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendSourcesIntent {
    pub wants_sources: bool,
    pub address: Option<String>,
    pub scope: SourceScope,
    pub count: Option<i64>,
}

/// The single action the router settled on for one chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ResolvedAction {
    /// Plain retrieval-augmented answer
    Chat,
    CreatePdf {
        kind: PdfKind,
        address: Option<String>,
    },
    SendDocuments {
        topic: String,
        address: Option<String>,
    },
    BulkSend {
        selection: PdfSelection,
        count: Option<i64>,
        address: Option<String>,
    },
    SendSources {
        scope: SourceScope,
        count: Option<i64>,
        address: Option<String>,
    },
}

impl ResolvedAction {
    pub fn name(&self) -> &'static str {
        match self {
            ResolvedAction::Chat => "chat",
            ResolvedAction::CreatePdf { .. } => "create_pdf",
            ResolvedAction::SendDocuments { .. } => "send_documents",
            ResolvedAction::BulkSend { .. } => "bulk_send",
            ResolvedAction::SendSources { .. } => "send_sources",
        }
    }

    pub fn address(&self) -> Option<&str> {
        match self {
            ResolvedAction::Chat => None,
            ResolvedAction::CreatePdf { address, .. }
            | ResolvedAction::SendDocuments { address, .. }
            | ResolvedAction::BulkSend { address, .. }
            | ResolvedAction::SendSources { address, .. } => address.as_deref(),
        }
    }

    /// Replace the target address. No-op for plain chat.
    pub fn with_address(mut self, new_address: String) -> Self {
        match &mut self {
            ResolvedAction::Chat => {}
            ResolvedAction::CreatePdf { address, .. }
            | ResolvedAction::SendDocuments { address, .. }
            | ResolvedAction::BulkSend { address, .. }
            | ResolvedAction::SendSources { address, .. } => *address = Some(new_address),
        }
        self
    }
}

// =============================================================================
// COLLABORATOR TYPES
// =============================================================================

/// Object listed by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StoredObject {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Metadata filter for vector search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub file_name: Option<String>,
}

impl SearchFilter {
    pub fn by_file(file_name: impl Into<String>) -> Self {
        Self {
            file_name: Some(file_name.into()),
        }
    }

    pub fn matches(&self, metadata: &Map<String, JsonValue>) -> bool {
        match &self.file_name {
            Some(wanted) => metadata
                .get("file_name")
                .and_then(|v| v.as_str())
                .is_some_and(|f| f == wanted),
            None => true,
        }
    }
}

/// One hit from the vector search collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub id: String,
    pub text: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Map<String, JsonValue>,
}

impl SearchMatch {
    /// Object-store key of the uploaded document this chunk came from.
    pub fn file_name(&self) -> Option<&str> {
        self.metadata.get("file_name").and_then(|v| v.as_str())
    }

    pub fn chunk_id(&self) -> Option<String> {
        self.metadata.get("chunk_id").map(|v| match v {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// A chunk to be written to the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vector,
    pub metadata: Map<String, JsonValue>,
}

/// File attached to an outbound email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl EmailAttachment {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = if file_name.to_lowercase().ends_with(".pdf") {
            "application/pdf"
        } else {
            "application/octet-stream"
        };
        Self {
            file_name,
            content_type: content_type.to_string(),
            bytes,
        }
    }
}

/// A retrieved passage reported back to the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SourceRef {
    pub file_name: String,
    pub chunk_id: Option<String>,
    pub relevance_score: f32,
}

/// Last path segment of an object-store key.
pub fn display_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}
