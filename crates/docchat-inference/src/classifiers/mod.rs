//! LLM-backed intent classifiers.
//!
//! Each classifier answers one narrow question about the latest chat
//! message ("does the user want an email?", "which generated PDFs?").
//! They share one capability, [`Classifier`], and one implementation,
//! [`PromptClassifier`], parameterised by an [`IntentPrompt`] that owns the
//! prompt text, the JSON schema and the validation rules.
//!
//! Completions are requested in structured-output mode. A response that
//! does not match the declared shape is [`Error::MalformedClassifierOutput`],
//! which callers treat as "no intent".

mod bulk_send;
mod email;
mod pdf_creation;
mod send_documents;
mod send_sources;

pub use bulk_send::BulkSendPrompt;
pub use email::EmailIntentPrompt;
pub use pdf_creation::PdfCreationPrompt;
pub use send_documents::SendDocumentsPrompt;
pub use send_sources::SendSourcesPrompt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, warn};

use docchat_core::extract::is_valid_email;
use docchat_core::{
    BulkSendIntent, ConversationTurn, EmailIntent, Error, GeneratedPdfRecord, GenerationBackend,
    PdfCreationIntent, PromptMessage, Result, SendDocumentsIntent, SendSourcesIntent,
    StructuredSchema,
};

/// Everything a classifier may look at for one message.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationContext<'a> {
    pub message: &'a str,
    pub history: &'a [ConversationTurn],
    pub remembered_email: Option<&'a str>,
    /// Generated PDFs in chronological order
    pub generated_pdfs: &'a [GeneratedPdfRecord],
}

impl<'a> ClassificationContext<'a> {
    pub fn new(message: &'a str, history: &'a [ConversationTurn]) -> Self {
        Self {
            message,
            history,
            remembered_email: None,
            generated_pdfs: &[],
        }
    }

    pub fn with_remembered_email(mut self, email: Option<&'a str>) -> Self {
        self.remembered_email = email;
        self
    }

    pub fn with_generated_pdfs(mut self, pdfs: &'a [GeneratedPdfRecord]) -> Self {
        self.generated_pdfs = pdfs;
        self
    }

    /// The last `exchanges` user/assistant pairs as `Role: content` lines.
    pub fn history_window(&self, exchanges: usize) -> String {
        let turns = exchanges * 2;
        let start = self.history.len().saturating_sub(turns);
        self.history[start..]
            .iter()
            .map(|t| format!("{}: {}", t.role.label(), t.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The turn immediately before the current message, if any.
    pub fn previous_turn(&self) -> Option<&'a ConversationTurn> {
        self.history.last()
    }
}

/// A classifier producing intent `I`.
#[async_trait]
pub trait Classifier<I>: Send + Sync
where
    I: Default + Send + 'static,
{
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Classify the message. Errors are upstream failures or
    /// [`Error::MalformedClassifierOutput`].
    async fn classify(&self, ctx: &ClassificationContext<'_>) -> Result<I>;

    /// Classify, treating any failure as no intent.
    async fn classify_or_default(&self, ctx: &ClassificationContext<'_>) -> I {
        match self.classify(ctx).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!(
                    classifier = self.name(),
                    error = %e,
                    "Classifier failed, treating as no intent"
                );
                I::default()
            }
        }
    }
}

/// Prompt, schema and validation for one intent.
pub trait IntentPrompt: Send + Sync + 'static {
    type Output: Default + Debug + Send + 'static;

    /// Schema name and log identifier.
    const NAME: &'static str;

    /// How many user/assistant exchanges of history the prompt shows.
    const HISTORY_EXCHANGES: usize;

    /// Cheap local check; when false the classifier returns no intent
    /// without calling the model.
    fn precondition(&self, _ctx: &ClassificationContext<'_>) -> bool {
        true
    }

    fn system_prompt(&self) -> &'static str;

    /// User prompt. `history` is the rendered history window, possibly empty.
    fn user_prompt(&self, ctx: &ClassificationContext<'_>, history: &str) -> String;

    /// JSON schema of the expected response object.
    fn schema(&self) -> JsonValue;

    /// Validate the structured response.
    fn parse(&self, value: JsonValue, ctx: &ClassificationContext<'_>) -> Result<Self::Output>;
}

/// [`Classifier`] implementation that asks a [`GenerationBackend`].
pub struct PromptClassifier<P> {
    backend: Arc<dyn GenerationBackend>,
    prompt: P,
}

impl<P: IntentPrompt> PromptClassifier<P> {
    pub fn new(backend: Arc<dyn GenerationBackend>, prompt: P) -> Self {
        Self { backend, prompt }
    }

    /// Messages sent to the model for this context.
    pub fn build_messages(&self, ctx: &ClassificationContext<'_>) -> Vec<PromptMessage> {
        let history = ctx.history_window(P::HISTORY_EXCHANGES);
        vec![
            PromptMessage::system(self.prompt.system_prompt()),
            PromptMessage::user(self.prompt.user_prompt(ctx, &history)),
        ]
    }

    pub fn schema(&self) -> StructuredSchema {
        StructuredSchema {
            name: P::NAME.to_string(),
            schema: self.prompt.schema(),
        }
    }
}

#[async_trait]
impl<P: IntentPrompt> Classifier<P::Output> for PromptClassifier<P> {
    fn name(&self) -> &'static str {
        P::NAME
    }

    async fn classify(&self, ctx: &ClassificationContext<'_>) -> Result<P::Output> {
        if !self.prompt.precondition(ctx) {
            debug!(classifier = P::NAME, "Precondition not met, skipping model call");
            return Ok(P::Output::default());
        }

        let messages = self.build_messages(ctx);
        let value = self
            .backend
            .complete_structured(&messages, &self.schema())
            .await?;
        let intent = self.prompt.parse(value, ctx)?;

        debug!(classifier = P::NAME, intent = ?intent, "Classified message");
        Ok(intent)
    }
}

/// The five classifiers the router consults.
#[derive(Clone)]
pub struct IntentClassifiers {
    pub email: Arc<dyn Classifier<EmailIntent>>,
    pub pdf_creation: Arc<dyn Classifier<PdfCreationIntent>>,
    pub send_documents: Arc<dyn Classifier<SendDocumentsIntent>>,
    pub bulk_send: Arc<dyn Classifier<BulkSendIntent>>,
    pub send_sources: Arc<dyn Classifier<SendSourcesIntent>>,
}

impl IntentClassifiers {
    /// LLM-backed classifiers sharing one backend.
    pub fn from_backend(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            email: Arc::new(PromptClassifier::new(backend.clone(), EmailIntentPrompt)),
            pdf_creation: Arc::new(PromptClassifier::new(backend.clone(), PdfCreationPrompt)),
            send_documents: Arc::new(PromptClassifier::new(
                backend.clone(),
                SendDocumentsPrompt,
            )),
            bulk_send: Arc::new(PromptClassifier::new(backend.clone(), BulkSendPrompt)),
            send_sources: Arc::new(PromptClassifier::new(backend, SendSourcesPrompt)),
        }
    }
}

// =============================================================================
// SHARED HELPERS
// =============================================================================

/// Deserialize the structured response, mapping shape errors.
pub(crate) fn parse_fields<T: DeserializeOwned>(name: &str, value: JsonValue) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| Error::MalformedClassifierOutput(format!("{}: {}", name, e)))
}

/// Strict-mode object schema: every property required, nothing extra.
pub(crate) fn object_schema(properties: JsonValue) -> JsonValue {
    let required: Vec<String> = properties
        .as_object()
        .map(|o| o.keys().cloned().collect())
        .unwrap_or_default();
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

/// Trim an address the model returned, dropping empty or invalid ones.
pub(crate) fn clean_address(name: &str, address: Option<String>) -> Option<String> {
    let address = address?.trim().to_string();
    if address.is_empty() {
        return None;
    }
    if !is_valid_email(&address) {
        warn!(classifier = name, address = %address, "Discarding invalid email address");
        return None;
    }
    Some(address)
}

pub(crate) fn history_section(history: &str) -> String {
    if history.is_empty() {
        String::new()
    } else {
        format!("\nCONVERSATION HISTORY:\n{}\n", history)
    }
}

pub(crate) fn remembered_section(ctx: &ClassificationContext<'_>) -> String {
    match ctx.remembered_email {
        Some(email) => format!(
            "\nREMEMBERED EMAIL: {}\nIf the user says \"email me\" or \"send to me\" without giving an address, use this remembered email.\n",
            email
        ),
        None => String::new(),
    }
}

pub(crate) fn generated_pdfs_section(ctx: &ClassificationContext<'_>) -> String {
    if ctx.generated_pdfs.is_empty() {
        return "\nGENERATED PDFS IN THIS CONVERSATION: none\n".to_string();
    }
    let lines: Vec<String> = ctx
        .generated_pdfs
        .iter()
        .enumerate()
        .map(|(i, pdf)| format!("{}. {} (created {})", i + 1, pdf.file_name, pdf.timestamp))
        .collect();
    format!(
        "\nGENERATED PDFS IN THIS CONVERSATION (oldest first):\n{}\n",
        lines.join("\n")
    )
}
