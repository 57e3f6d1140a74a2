//! Executes the action the router resolved and builds the chat reply.
//!
//! Every flow ends in a [`ChatReply`]. Expected conditions (no PDFs yet,
//! no address, email not configured) and upstream failures become
//! conversational messages; only internal errors propagate.

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use docchat_core::defaults::{
    ANSWER_MAX_TOKENS, ANSWER_TEMPERATURE, CONTENT_PDF_FALLBACK_NAME, HISTORY_PDF_NAME,
    PDF_CONTENT_TOP_K, PDF_TOPIC_MAX_CHARS, RELEVANCE_PREVIEW_CHARS, SEND_DOCS_TOP_K,
    SHORT_HISTORY_EXCHANGES, SUMMARY_MAX_TOKENS, SUMMARY_TEMPERATURE, TOPIC_MAX_TOKENS,
};
use docchat_core::extract::{download_marker, GENERATED_PDF_PREFIX, PDF_VIEW_ROUTE};
use docchat_core::{
    display_name, CompletionOptions, ConversationPdfIndex, ConversationTurn, EmailAttachment,
    Error, GenerationBackend, Mailer, ObjectStore, PdfKind, PdfMetadata, PdfRenderer,
    PdfSelection, PromptMessage, ResolvedAction, Result, SourceRef, SourceScope,
};
use docchat_search::{group_by_document, DocumentHit};

use super::retrieval::{
    cited_documents, cited_sources, labelled_context, parse_relevant_docs, simple_name,
    split_sources_used, Retriever,
};

const EMAIL_NOT_CONFIGURED: &str = "Email service is not configured. Please contact your administrator to enable email features.";

/// Request-scoped inputs the flows need besides the action.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequestContext<'a> {
    pub message: &'a str,
    pub history: &'a [ConversationTurn],
    pub file_filter: Option<&'a str>,
    pub top_k: usize,
}

/// Reply payload returned to the UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct ChatReply {
    pub message: String,
    pub sources: Vec<SourceRef>,
    /// Resolved action name (`chat`, `create_pdf`, ...)
    pub action: String,
    pub is_pdf_response: bool,
    pub is_send_docs_response: bool,
    pub is_bulk_send_response: bool,
    pub is_send_source_docs_response: bool,
    pub email_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdfs_count: Option<usize>,
    /// Action waiting for the user to supply an address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awaiting_email_for: Option<String>,
}

impl ChatReply {
    fn new(action: &ResolvedAction, message: impl Into<String>) -> Self {
        let mut reply = Self {
            message: message.into(),
            action: action.name().to_string(),
            ..Default::default()
        };
        match action {
            ResolvedAction::Chat => {}
            ResolvedAction::CreatePdf { .. } => reply.is_pdf_response = true,
            ResolvedAction::SendDocuments { .. } => reply.is_send_docs_response = true,
            ResolvedAction::BulkSend { .. } => reply.is_bulk_send_response = true,
            ResolvedAction::SendSources { .. } => reply.is_send_source_docs_response = true,
        }
        reply
    }

    fn awaiting_address(action: &ResolvedAction, message: String) -> Self {
        let mut reply = Self::new(action, message);
        reply.awaiting_email_for = Some(action.name().to_string());
        reply
    }

    fn delivered(mut self, address: &str) -> Self {
        self.email_sent = true;
        self.email_address = Some(address.to_string());
        self
    }
}

/// `Tell me about Q3!` → `Tell_me_about_Q3_content.pdf`.
pub fn content_pdf_name(topic: &str) -> String {
    let cleaned: String = topic
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, '_' | '-'))
        .take(PDF_TOPIC_MAX_CHARS)
        .collect();
    let stem = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
    if stem.is_empty() {
        CONTENT_PDF_FALLBACK_NAME.to_string()
    } else {
        format!("{}_content.pdf", stem)
    }
}

fn bullet_list(keys: &[String]) -> String {
    keys.iter()
        .map(|k| format!("- {}", display_name(k)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn transcript(history: &[ConversationTurn]) -> String {
    history
        .iter()
        .map(|t| format!("{}: {}", t.role.label(), t.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn apology(action: &ResolvedAction) -> String {
    let activity = match action {
        ResolvedAction::Chat => "answering your question",
        ResolvedAction::CreatePdf { .. } => "creating your PDF",
        ResolvedAction::SendDocuments { .. } => "gathering your documents",
        ResolvedAction::BulkSend { .. } => "sending your PDFs",
        ResolvedAction::SendSources { .. } => "gathering the source documents",
    };
    format!(
        "I'm sorry, something went wrong while {}. Please try again in a moment.",
        activity
    )
}

/// Runs resolved actions against the collaborators.
pub struct ActionDispatcher {
    retriever: Arc<Retriever>,
    generator: Arc<dyn GenerationBackend>,
    store: Arc<dyn ObjectStore>,
    mailer: Option<Arc<dyn Mailer>>,
    renderer: Arc<dyn PdfRenderer>,
    backend_url: String,
    assistant_name: String,
}

impl ActionDispatcher {
    pub fn new(
        retriever: Arc<Retriever>,
        generator: Arc<dyn GenerationBackend>,
        store: Arc<dyn ObjectStore>,
        mailer: Option<Arc<dyn Mailer>>,
        renderer: Arc<dyn PdfRenderer>,
    ) -> Self {
        Self {
            retriever,
            generator,
            store,
            mailer,
            renderer,
            backend_url: docchat_core::defaults::BACKEND_URL.to_string(),
            assistant_name: docchat_core::defaults::ASSISTANT_NAME.to_string(),
        }
    }

    /// Base URL written into download links.
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_assistant_name(mut self, name: impl Into<String>) -> Self {
        self.assistant_name = name.into();
        self
    }

    /// Execute `action` and build the reply.
    pub async fn dispatch(
        &self,
        action: &ResolvedAction,
        ctx: &ChatRequestContext<'_>,
    ) -> Result<ChatReply> {
        let start = Instant::now();
        let result = match action {
            ResolvedAction::Chat => self.answer(ctx).await,
            ResolvedAction::CreatePdf { kind, address } => {
                self.create_pdf(action, *kind, address.as_deref(), ctx).await
            }
            ResolvedAction::SendDocuments { topic, address } => {
                self.send_documents(action, topic, address.as_deref()).await
            }
            ResolvedAction::BulkSend {
                selection,
                count,
                address,
            } => {
                self.bulk_send(action, *selection, *count, address.as_deref(), ctx)
                    .await
            }
            ResolvedAction::SendSources {
                scope,
                count,
                address,
            } => {
                self.send_sources(action, *scope, *count, address.as_deref(), ctx)
                    .await
            }
        };

        let reply = match result {
            Ok(reply) => reply,
            Err(Error::InvalidSelection(reason)) => {
                debug!(action = action.name(), reason = %reason, "Selection could not be applied");
                ChatReply::new(
                    action,
                    format!(
                        "I couldn't work out which PDFs you meant ({}). Try \"send all the PDFs\" or \"send the last 2 PDFs\".",
                        reason
                    ),
                )
            }
            Err(Error::NoAddressResolved(prompt)) => {
                debug!(action = action.name(), "Waiting for an email address");
                ChatReply::awaiting_address(action, prompt)
            }
            Err(e) if e.is_upstream() => {
                warn!(action = action.name(), error = %e, "Action failed upstream");
                ChatReply::new(action, apology(action))
            }
            Err(e) => return Err(e),
        };

        info!(
            action = action.name(),
            email_sent = reply.email_sent,
            source_count = reply.sources.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Dispatched action"
        );
        Ok(reply)
    }

    // =========================================================================
    // CHAT
    // =========================================================================

    fn chat_system_prompt(&self, context: &str) -> String {
        format!(
            r#"You are {name}, a helpful assistant that answers questions about the user's uploaded documents.

Answer using only the document context below. If the context does not contain the answer, say so plainly. You can also create PDF reports of the conversation or of document content, and email uploaded documents, generated PDFs and their source documents to the user.

DOCUMENT CONTEXT:
{context}

Each context block is labelled [Source: name]. After your answer, add one final line naming the sources you actually used:
SOURCES_USED: name1, name2
If you used none, write SOURCES_USED: none"#,
            name = self.assistant_name,
            context = context
        )
    }

    async fn answer(&self, ctx: &ChatRequestContext<'_>) -> Result<ChatReply> {
        let matches = self
            .retriever
            .retrieve(ctx.message, ctx.top_k, ctx.file_filter)
            .await?;

        let mut messages = Vec::with_capacity(ctx.history.len() + 2);
        messages.push(PromptMessage::system(
            self.chat_system_prompt(&labelled_context(&matches)),
        ));
        messages.extend(ctx.history.iter().map(PromptMessage::from));
        messages.push(PromptMessage::user(ctx.message));

        let raw = self
            .generator
            .complete(
                &messages,
                CompletionOptions::creative(ANSWER_TEMPERATURE, ANSWER_MAX_TOKENS),
            )
            .await?;
        let (answer, named) = split_sources_used(&raw);

        let mut reply = ChatReply::new(&ResolvedAction::Chat, answer);
        reply.sources = cited_sources(&matches, named.as_deref());
        Ok(reply)
    }

    // =========================================================================
    // PDF CREATION
    // =========================================================================

    async fn create_pdf(
        &self,
        action: &ResolvedAction,
        kind: PdfKind,
        address: Option<&str>,
        ctx: &ChatRequestContext<'_>,
    ) -> Result<ChatReply> {
        let (title, body, sources, file_name) = match kind {
            PdfKind::History => {
                if ctx.history.is_empty() {
                    return Ok(ChatReply::new(
                        action,
                        "I'd love to create a PDF of our conversation, but we don't have any chat history yet. Please have a conversation with me first!",
                    ));
                }
                let summary = self.summarize(ctx.history).await?;
                (
                    "Conversation Summary".to_string(),
                    summary,
                    Vec::new(),
                    HISTORY_PDF_NAME.to_string(),
                )
            }
            PdfKind::VectorContent => {
                let topic = self.extract_topic(ctx).await?;
                let matches = self
                    .retriever
                    .retrieve(&topic, PDF_CONTENT_TOP_K, ctx.file_filter)
                    .await?;
                if matches.is_empty() {
                    return Ok(ChatReply::new(
                        action,
                        "I couldn't find any relevant content in the documents to create a PDF. Please try a different query or upload documents first.",
                    ));
                }

                let raw = self
                    .generator
                    .generate_with_system(
                        "You are a professional report writer. Write only from the provided document context.",
                        &format!(
                            "Write a detailed, well-structured report about: {}\n\nUse only the document context below. Organise the report with headings and bullet points where helpful.\n\nDOCUMENT CONTEXT:\n{}\n\nEnd with one line naming the sources you used:\nSOURCES_USED: name1, name2",
                            topic,
                            labelled_context(&matches)
                        ),
                        CompletionOptions::creative(ANSWER_TEMPERATURE, SUMMARY_MAX_TOKENS),
                    )
                    .await?;
                let (report, named) = split_sources_used(&raw);
                let sources = match named {
                    Some(named) => cited_documents(&cited_sources(&matches, Some(named.as_slice()))),
                    None => {
                        let mut seen = HashSet::new();
                        matches
                            .iter()
                            .filter_map(|m| m.file_name())
                            .filter(|f| seen.insert(f.to_string()))
                            .map(str::to_string)
                            .collect()
                    }
                };
                (
                    format!("Report: {}", topic),
                    report,
                    sources,
                    content_pdf_name(&topic),
                )
            }
        };

        let bytes = self.renderer.render_report(&title, &body, &sources)?;
        let metadata = PdfMetadata::new(Utc::now(), kind, sources);
        let key = format!(
            "{}{}_{}",
            GENERATED_PDF_PREFIX,
            metadata.timestamp_token(),
            file_name
        );
        self.store
            .put(&key, &bytes, metadata.to_storage_map())
            .await?;
        info!(
            storage_key = %key,
            kind = kind.as_str(),
            source_count = metadata.source_document_keys.len(),
            "Stored generated PDF"
        );

        let marker = download_marker(&self.backend_url, &key);
        let mut reply = ChatReply::new(action, String::new());
        reply.pdf_url = Some(format!("{}{}{}", self.backend_url, PDF_VIEW_ROUTE, key));

        let Some(address) = address else {
            reply.message = format!("I've created your PDF! You can download it here: {}", marker);
            return Ok(reply);
        };
        let Some(mailer) = &self.mailer else {
            reply.message = format!(
                "I've created your PDF! You can download it here: {}\n\n{}",
                marker, EMAIL_NOT_CONFIGURED
            );
            return Ok(reply);
        };

        let subject = match kind {
            PdfKind::History => "Your Conversation Summary",
            PdfKind::VectorContent => "Your Document Report",
        };
        let email_body = format!(
            "Hello,\n\nAttached is the PDF you requested: {}.\n\nBest regards,\n{}",
            title, self.assistant_name
        );
        let attachment = EmailAttachment::new(display_name(&key), bytes);
        match mailer
            .send(address, subject, &email_body, vec![attachment])
            .await
        {
            Ok(()) => {
                reply.message = format!(
                    "✅ Perfect! I've created your PDF and sent it to **{}**. You can also download it here: {}",
                    address, marker
                );
                Ok(reply.delivered(address))
            }
            Err(e) => {
                warn!(storage_key = %key, error = %e, "Generated PDF could not be emailed");
                reply.message = format!(
                    "I created the PDF but couldn't send it to {}. Error: {}. You can download it here instead: {}",
                    address, e, marker
                );
                reply.email_address = Some(address.to_string());
                Ok(reply)
            }
        }
    }

    async fn summarize(&self, history: &[ConversationTurn]) -> Result<String> {
        let prompt = format!(
            "Create a comprehensive summary of the following conversation.\n\nCONVERSATION:\n{}\n\nStructure the summary with these sections:\n## Overview\n## Key Topics Discussed\n## Important Information\n## Action Items or Conclusions\n\nUse clear headings and bullet points.",
            transcript(history)
        );
        self.generator
            .generate_with_system(
                "You are a professional document summarizer. Create clear, well-structured summaries.",
                &prompt,
                CompletionOptions::creative(SUMMARY_TEMPERATURE, SUMMARY_MAX_TOKENS),
            )
            .await
    }

    /// Topic the user wants a document PDF about, with "that"/"it"
    /// resolved against recent history.
    async fn extract_topic(&self, ctx: &ChatRequestContext<'_>) -> Result<String> {
        let recent = ctx
            .history
            .len()
            .saturating_sub(SHORT_HISTORY_EXCHANGES * 2);
        let prompt = format!(
            "CONVERSATION:\n{}\n\nUSER REQUEST: {}\n\nWhat topic should the PDF cover? Resolve references such as \"that\" or \"it\" using the conversation. Return only the topic.",
            transcript(&ctx.history[recent..]),
            ctx.message
        );
        let topic = self
            .generator
            .generate_with_system(
                "You extract topics from user requests. Return only the topic, nothing else.",
                &prompt,
                CompletionOptions::deterministic(TOPIC_MAX_TOKENS),
            )
            .await?;

        let topic = topic.trim().trim_matches(['"', '\'']).trim().to_string();
        debug!(topic = %topic, "Extracted PDF topic");
        if topic.is_empty() {
            Ok(ctx.message.to_string())
        } else {
            Ok(topic)
        }
    }

    // =========================================================================
    // SENDING
    // =========================================================================

    async fn send_documents(
        &self,
        action: &ResolvedAction,
        topic: &str,
        address: Option<&str>,
    ) -> Result<ChatReply> {
        let Some(mailer) = &self.mailer else {
            return Ok(ChatReply::new(action, EMAIL_NOT_CONFIGURED));
        };
        let Some(address) = address else {
            return Err(Error::NoAddressResolved(format!(
                "I'd be happy to send you documents about {}! What email address would you like me to send them to?",
                topic
            )));
        };

        let matches = self.retriever.retrieve(topic, SEND_DOCS_TOP_K, None).await?;
        let hits = group_by_document(matches);
        if hits.is_empty() {
            return Ok(ChatReply::new(
                action,
                format!(
                    "I couldn't find any documents related to '{}'. Please try a different search term or upload documents first.",
                    topic
                ),
            ));
        }

        let relevant = self.filter_relevant(topic, &hits).await;
        if relevant.is_empty() {
            return Ok(ChatReply::new(
                action,
                format!(
                    "I searched through the uploaded documents but couldn't find any that are specifically about '{}'. Please try a different search term.",
                    topic
                ),
            ));
        }

        let attachments = self.fetch_attachments(&relevant).await;
        if attachments.is_empty() {
            return Ok(ChatReply::new(
                action,
                "I found relevant documents but couldn't retrieve them from storage. Please try again later.",
            ));
        }

        let names = attachment_keys(&relevant, &attachments);
        let body = format!(
            "Hello,\n\nAs requested, attached are {} document(s) related to '{}':\n\n{}\n\nBest regards,\n{}",
            names.len(),
            topic,
            bullet_list(&names),
            self.assistant_name
        );
        let subject = format!("Documents related to: {}", topic);
        self.deliver(
            action,
            mailer.as_ref(),
            address,
            &subject,
            &body,
            attachments,
            format!(
                "✅ Perfect! I've sent {} document(s) related to '{}' to **{}**.\n\nDocuments sent:\n{}\n\nPlease check your inbox (and spam folder just in case).",
                names.len(),
                topic,
                address,
                bullet_list(&names)
            ),
            "I found the documents but couldn't send the email.",
        )
        .await
        .map(|mut reply| {
            reply.documents_count = Some(names.len());
            reply
        })
    }

    /// Ask the model which candidate documents are really about `topic`.
    /// Falls back to every candidate when the answer is unusable.
    async fn filter_relevant(&self, topic: &str, hits: &[DocumentHit]) -> Vec<String> {
        let all: Vec<String> = hits.iter().map(|h| h.file_name.clone()).collect();
        let blocks = hits
            .iter()
            .map(|h| {
                let preview: String = h.best_text().chars().take(RELEVANCE_PREVIEW_CHARS).collect();
                format!("[Source: {}]\n{}", simple_name(&h.file_name), preview)
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = format!(
            "TOPIC: {}\n\nBelow are excerpts from documents that matched a search for this topic. Decide which documents are genuinely about the topic, not just mentioning a related word.\n\n{}\n\nList only the relevant documents by their source name.\nFormat: RELEVANT_DOCS: source1, source2\nIf none are relevant, answer RELEVANT_DOCS: none",
            topic, blocks
        );

        let answer = match self
            .generator
            .generate_with_system(
                "You are a document relevance analyzer. Be strict and selective about relevance.",
                &prompt,
                CompletionOptions::deterministic(200),
            )
            .await
        {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Relevance filter failed, keeping all candidates");
                return all;
            }
        };

        let Some(named) = parse_relevant_docs(&answer) else {
            debug!("Relevance filter ignored the answer format, keeping all candidates");
            return all;
        };
        let wanted: HashSet<String> = named.iter().map(|n| n.to_lowercase()).collect();
        let relevant: Vec<String> = all
            .into_iter()
            .filter(|key| wanted.contains(&simple_name(key).to_lowercase()))
            .collect();
        debug!(
            candidates = hits.len(),
            relevant = relevant.len(),
            "Filtered documents by relevance"
        );
        relevant
    }

    async fn bulk_send(
        &self,
        action: &ResolvedAction,
        selection: PdfSelection,
        count: Option<i64>,
        address: Option<&str>,
        ctx: &ChatRequestContext<'_>,
    ) -> Result<ChatReply> {
        let Some(mailer) = &self.mailer else {
            return Ok(ChatReply::new(action, EMAIL_NOT_CONFIGURED));
        };
        let pdfs = ConversationPdfIndex::from_history(ctx.history);
        if pdfs.is_empty() {
            return Ok(ChatReply::new(
                action,
                "I couldn't find any generated PDFs in our conversation history. Please create some PDFs first!",
            ));
        }
        let Some(address) = address else {
            return Err(Error::NoAddressResolved(
                "I'd be happy to send you the PDFs! What email address would you like me to send them to?"
                    .to_string(),
            ));
        };

        let keys: Vec<String> = pdfs
            .select(selection, count)?
            .into_iter()
            .map(|r| r.storage_key)
            .collect();
        let attachments = self.fetch_attachments(&keys).await;
        if attachments.is_empty() {
            return Ok(ChatReply::new(
                action,
                "I found the PDFs but couldn't retrieve them from storage. Please try again later.",
            ));
        }

        let names = attachment_keys(&keys, &attachments);
        let body = format!(
            "Hello,\n\nAttached are {} PDF(s) generated during our conversation:\n\n{}\n\nBest regards,\n{}",
            names.len(),
            bullet_list(&names),
            self.assistant_name
        );
        let subject = format!("Your Generated PDFs ({} document(s))", names.len());
        self.deliver(
            action,
            mailer.as_ref(),
            address,
            &subject,
            &body,
            attachments,
            format!(
                "✅ Perfect! I've sent {} generated PDF(s) to **{}**.\n\nPDFs sent:\n{}\n\nPlease check your inbox (and spam folder just in case).",
                names.len(),
                address,
                bullet_list(&names)
            ),
            "I found the PDFs but couldn't send the email.",
        )
        .await
        .map(|mut reply| {
            reply.pdfs_count = Some(names.len());
            reply
        })
    }

    async fn send_sources(
        &self,
        action: &ResolvedAction,
        scope: SourceScope,
        count: Option<i64>,
        address: Option<&str>,
        ctx: &ChatRequestContext<'_>,
    ) -> Result<ChatReply> {
        let Some(mailer) = &self.mailer else {
            return Ok(ChatReply::new(action, EMAIL_NOT_CONFIGURED));
        };
        let pdfs = ConversationPdfIndex::from_history(ctx.history);
        if pdfs.is_empty() {
            return Ok(ChatReply::new(
                action,
                "I couldn't find any generated PDFs in our conversation history to get sources from.",
            ));
        }
        let Some(address) = address else {
            return Err(Error::NoAddressResolved(
                "I'd be happy to send you the source documents! What email address would you like me to send them to?"
                    .to_string(),
            ));
        };

        let selected = pdfs.select_scope(scope, count)?;
        let metadata = join_all(
            selected
                .iter()
                .map(|pdf| self.store.head_metadata(&pdf.storage_key)),
        )
        .await;

        let mut sources: Vec<String> = Vec::new();
        for (pdf, meta) in selected.iter().zip(metadata) {
            match meta {
                Ok(map) => {
                    for key in PdfMetadata::source_documents_from(&map) {
                        if !sources.contains(&key) {
                            sources.push(key);
                        }
                    }
                }
                Err(e) => {
                    warn!(storage_key = %pdf.storage_key, error = %e, "Could not read PDF metadata")
                }
            }
        }
        debug!(
            pdf_count = selected.len(),
            source_count = sources.len(),
            "Collected source documents"
        );

        if sources.is_empty() {
            return Ok(ChatReply::new(
                action,
                "I couldn't find any source documents for the selected PDFs. The PDFs may have been generated from conversation history rather than document content.",
            ));
        }

        let attachments = self.fetch_attachments(&sources).await;
        if attachments.is_empty() {
            return Ok(ChatReply::new(
                action,
                "I found source documents but couldn't retrieve them from storage. Please try again later.",
            ));
        }

        let names = attachment_keys(&sources, &attachments);
        let body = format!(
            "Hello,\n\nAttached are the {} source document(s) used to create your PDF(s):\n\n{}\n\nBest regards,\n{}",
            names.len(),
            bullet_list(&names),
            self.assistant_name
        );
        let subject = format!("Source Documents ({} document(s))", names.len());
        self.deliver(
            action,
            mailer.as_ref(),
            address,
            &subject,
            &body,
            attachments,
            format!(
                "✅ Perfect! I've sent {} source document(s) to **{}**.\n\nSource documents sent:\n{}\n\nPlease check your inbox (and spam folder just in case).",
                names.len(),
                address,
                bullet_list(&names)
            ),
            "I found the source documents but couldn't send the email.",
        )
        .await
        .map(|mut reply| {
            reply.documents_count = Some(names.len());
            reply
        })
    }

    /// Fetch objects concurrently; failures are logged and skipped.
    async fn fetch_attachments(&self, keys: &[String]) -> Vec<EmailAttachment> {
        let fetched = join_all(keys.iter().map(|key| self.store.get(key))).await;
        keys.iter()
            .zip(fetched)
            .filter_map(|(key, result)| match result {
                Ok(bytes) => Some(EmailAttachment::new(display_name(key), bytes)),
                Err(e) => {
                    warn!(storage_key = %key, error = %e, "Skipping attachment that could not be fetched");
                    None
                }
            })
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    async fn deliver(
        &self,
        action: &ResolvedAction,
        mailer: &dyn Mailer,
        address: &str,
        subject: &str,
        body: &str,
        attachments: Vec<EmailAttachment>,
        success: String,
        failure: &str,
    ) -> Result<ChatReply> {
        let attachment_count = attachments.len();
        match mailer.send(address, subject, body, attachments).await {
            Ok(()) => {
                info!(action = action.name(), attachment_count, "Delivered email");
                Ok(ChatReply::new(action, success).delivered(address))
            }
            Err(e) => {
                warn!(action = action.name(), error = %e, "Email delivery failed");
                let mut reply = ChatReply::new(action, format!("{} Error: {}", failure, e));
                reply.email_address = Some(address.to_string());
                Ok(reply)
            }
        }
    }
}

/// Keys whose objects were actually fetched, in request order.
fn attachment_keys(keys: &[String], attachments: &[EmailAttachment]) -> Vec<String> {
    keys.iter()
        .filter(|k| attachments.iter().any(|a| a.file_name == display_name(k)))
        .cloned()
        .collect()
}
