//! Decides which single action a chat message resolves to.
//!
//! The router always consults the email and PDF-creation classifiers,
//! computes four cheap signals from the message, history and email intent,
//! then walks a fixed priority plan of the send classifiers (see
//! [`decide_branch`]).
//! The first classifier that reports its intent wins and later ones are
//! never called. Classifier failures count as "no intent".

use std::time::Instant;
use tracing::{debug, info};

use docchat_core::defaults::RECENT_PDF_TURNS;
use docchat_core::extract::{
    extract_most_recent_email, find_emails, has_download_marker, is_address_prompt,
    mentions_send, mentions_source,
};
use docchat_core::{ConversationPdfIndex, ConversationTurn, EmailIntent, ResolvedAction, Role};
use docchat_inference::{ClassificationContext, IntentClassifiers};

/// Keyword and history signals that select the branch plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingSignals {
    pub has_recent_pdfs: bool,
    pub mentions_send: bool,
    pub mentions_source: bool,
    /// The user wants email and a PDF was just created, so "email it"
    /// refers to that PDF rather than a new document search.
    pub emails_new_pdf: bool,
}

impl RoutingSignals {
    pub fn compute(
        message: &str,
        history: &[ConversationTurn],
        pdfs: &ConversationPdfIndex,
        email: &EmailIntent,
    ) -> Self {
        Self {
            has_recent_pdfs: pdfs.has_recent_pdfs(),
            mentions_send: mentions_send(message),
            mentions_source: mentions_source(message),
            emails_new_pdf: email.wants_email && pdf_just_created(history),
        }
    }
}

fn pdf_just_created(history: &[ConversationTurn]) -> bool {
    history
        .iter()
        .rev()
        .take(RECENT_PDF_TURNS)
        .any(|turn| turn.role == Role::Assistant && has_download_marker(&turn.content))
}

/// A send classifier the router may consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    BulkSend,
    SendDocuments,
    SendSources,
}

/// Ordered send classifiers to try for the given signals.
///
/// | recent | send | source | emails new PDF | plan                           |
/// |--------|------|--------|----------------|--------------------------------|
/// | any    | any  | yes    | any            | send sources                   |
/// | yes    | yes  | no     | no             | bulk send, then send documents |
/// | yes    | yes  | no     | yes            | bulk send                      |
/// | otherwise                              || send documents                 |
/// | otherwise, emailing a new PDF          || nothing                        |
///
/// A message naming sources never reaches the send-documents classifier,
/// so "send me the sources" cannot turn into a fresh topic search. Neither
/// does "email it to me" right after a PDF was created.
pub fn decide_branch(signals: RoutingSignals) -> &'static [Branch] {
    match (
        signals.has_recent_pdfs,
        signals.mentions_send,
        signals.mentions_source,
        signals.emails_new_pdf,
    ) {
        (_, _, true, _) => &[Branch::SendSources],
        (true, true, false, false) => &[Branch::BulkSend, Branch::SendDocuments],
        (true, true, false, true) => &[Branch::BulkSend],
        (_, _, false, false) => &[Branch::SendDocuments],
        (_, _, false, true) => &[],
    }
}

/// Pick the address for a send action: the branch classifier's own, then
/// the email classifier's, then the remembered one.
fn resolve_address(
    branch: Option<String>,
    email: &EmailIntent,
    remembered: Option<&str>,
) -> Option<String> {
    branch
        .or_else(|| email.address.clone())
        .or_else(|| remembered.map(str::to_string))
}

/// Resolves chat messages to [`ResolvedAction`]s.
#[derive(Clone)]
pub struct IntentRouter {
    classifiers: IntentClassifiers,
}

impl IntentRouter {
    pub fn new(classifiers: IntentClassifiers) -> Self {
        Self { classifiers }
    }

    /// Resolve the action for `message` given the prior `history`.
    ///
    /// If the assistant's last turn asked for an email address and the
    /// message supplies one, the request that prompted the question is
    /// routed again with the new address forced onto it.
    pub async fn route(&self, message: &str, history: &[ConversationTurn]) -> ResolvedAction {
        if let Some((original, earlier, address)) = address_follow_up(message, history) {
            let action = self.route_fresh(original, earlier).await;
            if action != ResolvedAction::Chat {
                info!(
                    action = action.name(),
                    "Resuming request after address follow-up"
                );
                return action.with_address(address);
            }
            debug!("Follow-up request resolved to chat, routing message as-is");
        }
        self.route_fresh(message, history).await
    }

    async fn route_fresh(&self, message: &str, history: &[ConversationTurn]) -> ResolvedAction {
        let start = Instant::now();
        let remembered = extract_most_recent_email(history);
        let pdfs = ConversationPdfIndex::from_history(history);

        let ctx = ClassificationContext::new(message, history)
            .with_remembered_email(remembered.as_deref())
            .with_generated_pdfs(pdfs.records());

        let email = self.classifiers.email.classify_or_default(&ctx).await;
        let pdf = self.classifiers.pdf_creation.classify_or_default(&ctx).await;
        let signals = RoutingSignals::compute(message, history, &pdfs, &email);

        let mut action = None;
        for branch in decide_branch(signals) {
            action = self
                .try_branch(*branch, &ctx, &email, remembered.as_deref())
                .await;
            if action.is_some() {
                break;
            }
        }

        let action = action.unwrap_or_else(|| match (pdf.wants_pdf, pdf.kind.pdf_kind()) {
            (true, Some(kind)) => {
                let address = if email.wants_email {
                    resolve_address(None, &email, remembered.as_deref())
                } else {
                    None
                };
                ResolvedAction::CreatePdf { kind, address }
            }
            _ => ResolvedAction::Chat,
        });

        info!(
            action = action.name(),
            has_recent_pdfs = signals.has_recent_pdfs,
            mentions_send = signals.mentions_send,
            mentions_source = signals.mentions_source,
            emails_new_pdf = signals.emails_new_pdf,
            history_len = history.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Routed chat message"
        );
        action
    }

    async fn try_branch(
        &self,
        branch: Branch,
        ctx: &ClassificationContext<'_>,
        email: &EmailIntent,
        remembered: Option<&str>,
    ) -> Option<ResolvedAction> {
        match branch {
            Branch::BulkSend => {
                let intent = self.classifiers.bulk_send.classify_or_default(ctx).await;
                intent.wants_bulk_send.then(|| ResolvedAction::BulkSend {
                    selection: intent.selection,
                    count: intent.count,
                    address: resolve_address(intent.address, email, remembered),
                })
            }
            Branch::SendDocuments => {
                let intent = self.classifiers.send_documents.classify_or_default(ctx).await;
                match (intent.wants_send_docs, intent.topic) {
                    (true, Some(topic)) => Some(ResolvedAction::SendDocuments {
                        topic,
                        address: resolve_address(intent.address, email, remembered),
                    }),
                    _ => None,
                }
            }
            Branch::SendSources => {
                let intent = self.classifiers.send_sources.classify_or_default(ctx).await;
                intent.wants_sources.then(|| ResolvedAction::SendSources {
                    scope: intent.scope,
                    count: intent.count,
                    address: resolve_address(intent.address, email, remembered),
                })
            }
        }
    }
}

/// When the last assistant turn asked for an address and `message` gives
/// one: the user request before that question, the history preceding it,
/// and the new address.
fn address_follow_up<'a>(
    message: &str,
    history: &'a [ConversationTurn],
) -> Option<(&'a str, &'a [ConversationTurn], String)> {
    let address = find_emails(message).into_iter().last()?;
    let (last, rest) = history.split_last()?;
    if last.role != Role::Assistant || !is_address_prompt(&last.content) {
        return None;
    }
    let (request, earlier) = rest.split_last()?;
    if request.role != Role::User {
        return None;
    }
    Some((request.content.as_str(), earlier, address))
}
