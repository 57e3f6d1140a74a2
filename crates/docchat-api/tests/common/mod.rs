//! Shared fixtures for docchat-api integration tests.
//!
//! Builds the service graph around the scripted mock backend, the in-memory
//! vector index and a filesystem store in a temp directory, so no test needs
//! network access.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value as JsonValue};
use tempfile::TempDir;

use docchat_api::{AppConfig, AppState, Collaborators};
use docchat_core::extract::download_marker;
use docchat_core::{
    ConversationTurn, EmailAttachment, EmbeddingBackend, Error, Mailer, ObjectStore, PdfKind,
    PdfMetadata, PdfRenderer, Result, VectorIndex, VectorRecord,
};
use docchat_inference::MockInferenceBackend;
use docchat_search::metadata::chunk_metadata;
use docchat_search::InMemoryVectorIndex;
use docchat_store::FilesystemStore;

pub const BACKEND_URL: &str = "http://test.local";

/// One email the [`RecordingMailer`] accepted.
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<String>,
}

/// Mailer that records messages instead of sending them.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentEmail>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        attachments: Vec<EmailAttachment>,
    ) -> Result<()> {
        if self.fail {
            return Err(Error::Email("SendGrid returned 500: unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            attachments: attachments.into_iter().map(|a| a.file_name).collect(),
        });
        Ok(())
    }
}

/// Renderer producing a tiny fake PDF that embeds its title.
pub struct FakeRenderer;

impl PdfRenderer for FakeRenderer {
    fn render_report(&self, title: &str, _body: &str, sources: &[String]) -> Result<Vec<u8>> {
        Ok(format!("%PDF-1.4 {} ({} sources)", title, sources.len()).into_bytes())
    }
}

/// Test harness: the collaborators plus the state built from them.
pub struct Harness {
    pub backend: Arc<MockInferenceBackend>,
    pub index: Arc<InMemoryVectorIndex>,
    pub store: Arc<FilesystemStore>,
    pub mailer: Option<Arc<RecordingMailer>>,
    pub state: AppState,
    _dir: TempDir,
}

impl Harness {
    pub fn new(backend: MockInferenceBackend) -> Self {
        Self::build(backend, Some(Arc::new(RecordingMailer::default())))
    }

    pub fn without_mailer(backend: MockInferenceBackend) -> Self {
        Self::build(backend, None)
    }

    pub fn with_mailer(backend: MockInferenceBackend, mailer: RecordingMailer) -> Self {
        Self::build(backend, Some(Arc::new(mailer)))
    }

    fn build(backend: MockInferenceBackend, mailer: Option<Arc<RecordingMailer>>) -> Self {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(backend);
        let index = Arc::new(InMemoryVectorIndex::new());
        let store = Arc::new(FilesystemStore::new(dir.path()));

        let config = AppConfig {
            backend_url: BACKEND_URL.to_string(),
            storage_path: dir.path().to_path_buf(),
            ..AppConfig::default()
        };
        let collab = Collaborators {
            embeddings: backend.clone(),
            generator: backend.clone(),
            index: index.clone(),
            store: store.clone(),
            mailer: mailer.clone().map(|m| m as Arc<dyn Mailer>),
            renderer: Arc::new(FakeRenderer),
        };

        Self {
            state: AppState::new(config, collab),
            backend,
            index,
            store,
            mailer,
            _dir: dir,
        }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.mailer.as_ref().map(|m| m.sent()).unwrap_or_default()
    }

    /// Store an uploaded document and index one chunk of its text.
    pub async fn seed_document(&self, key: &str, text: &str) {
        self.store
            .put(key, b"%PDF-1.4 uploaded", HashMap::new())
            .await
            .unwrap();
        let vector = self.backend.embed(text).await.unwrap();
        self.index
            .upsert(vec![VectorRecord {
                id: format!("{}_0", key),
                values: vector,
                metadata: chunk_metadata(key, 0, text, text.len() / 4),
            }])
            .await
            .unwrap();
    }

    /// Store a generated PDF whose metadata names `sources`.
    pub async fn seed_generated_pdf(&self, key: &str, sources: &[&str]) {
        let metadata = PdfMetadata::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
            PdfKind::VectorContent,
            sources.iter().map(|s| s.to_string()).collect(),
        );
        self.store
            .put(key, b"%PDF-1.4 generated", metadata.to_storage_map())
            .await
            .unwrap();
    }
}

/// Assistant turn linking to a generated PDF.
pub fn pdf_turn(key: &str) -> ConversationTurn {
    ConversationTurn::assistant(format!(
        "I've created your PDF! You can download it here: {}",
        download_marker(BACKEND_URL, key)
    ))
}

/// History holding one exchange that produced each of `keys`.
pub fn history_with_pdfs(keys: &[&str]) -> Vec<ConversationTurn> {
    let mut history = Vec::new();
    for key in keys {
        history.push(ConversationTurn::user("Create a PDF about that"));
        history.push(pdf_turn(key));
    }
    history
}

pub fn no_email() -> JsonValue {
    json!({"wants_email": false, "email_address": null})
}

pub fn wants_email(address: Option<&str>) -> JsonValue {
    json!({"wants_email": true, "email_address": address})
}

pub fn pdf_intent(intent: &str) -> JsonValue {
    json!({ "intent": intent })
}

pub fn no_send_docs() -> JsonValue {
    json!({"wants_send_docs": false, "email_address": null, "topic": null})
}

pub fn send_docs(topic: &str, address: Option<&str>) -> JsonValue {
    json!({"wants_send_docs": true, "email_address": address, "topic": topic})
}

pub fn no_bulk_send() -> JsonValue {
    json!({"wants_bulk_send": false, "email_address": null, "selection": "all", "count": null})
}

pub fn bulk_send(selection: &str, count: Option<i64>, address: Option<&str>) -> JsonValue {
    json!({"wants_bulk_send": true, "email_address": address, "selection": selection, "count": count})
}

pub fn no_sources() -> JsonValue {
    json!({"wants_sources": false, "email_address": null, "scope": "all", "count": null})
}

pub fn send_sources(scope: &str, count: Option<i64>, address: Option<&str>) -> JsonValue {
    json!({"wants_sources": true, "email_address": address, "scope": scope, "count": count})
}

/// Mock with every classifier scripted to "no intent".
pub fn quiet_backend() -> MockInferenceBackend {
    MockInferenceBackend::new()
        .with_structured("email_intent", no_email())
        .with_structured("pdf_creation_intent", pdf_intent("chat"))
        .with_structured("send_documents_intent", no_send_docs())
        .with_structured("bulk_send_intent", no_bulk_send())
        .with_structured("send_sources_intent", no_sources())
}
