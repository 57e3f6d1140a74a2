//! Integration tests for action dispatch.
//!
//! Flows run against the mock model backend, the in-memory index, a temp
//! directory object store and a recording mailer.

mod common;

use common::*;
use docchat_api::services::{ChatReply, ChatRequestContext};
use docchat_core::extract::PDF_VIEW_ROUTE;
use docchat_core::{
    ConversationPdfIndex, ConversationTurn, ObjectStore, PdfKind, PdfMetadata, PdfSelection,
    ResolvedAction, SourceScope,
};
use docchat_inference::MockInferenceBackend;

const DOC_Q3: &str = "pdfs/20250101_120000_q3_report.pdf";
const DOC_HEALTH: &str = "pdfs/20250102_120000_healthcare_policy.pdf";
const DOC_CATS: &str = "pdfs/20250103_120000_cat_care.pdf";
const PDF_A: &str = "generated_pdfs/20250105_100000_Report_A_content.pdf";
const PDF_B: &str = "generated_pdfs/20250106_100000_Report_B_content.pdf";
const ADDRESS: &str = "erin@example.com";

async fn run(
    harness: &Harness,
    action: ResolvedAction,
    message: &str,
    history: &[ConversationTurn],
) -> ChatReply {
    let ctx = ChatRequestContext {
        message,
        history,
        file_filter: None,
        top_k: 5,
    };
    harness.state.dispatcher.dispatch(&action, &ctx).await.unwrap()
}

// =============================================================================
// CHAT
// =============================================================================

#[tokio::test]
async fn test_chat_answer_reports_cited_sources() {
    let harness = Harness::new(
        MockInferenceBackend::new()
            .with_fixed_response("Revenue grew 12 percent.\nSOURCES_USED: 20250101_120000_q3_report"),
    );
    harness
        .seed_document(DOC_Q3, "Q3 revenue grew 12 percent year over year")
        .await;
    harness
        .seed_document(DOC_CATS, "Cats need fresh water daily")
        .await;

    let reply = run(&harness, ResolvedAction::Chat, "How did revenue change in Q3?", &[]).await;

    assert_eq!(reply.action, "chat");
    assert_eq!(reply.message, "Revenue grew 12 percent.");
    assert_eq!(reply.sources.len(), 1);
    assert_eq!(reply.sources[0].file_name, DOC_Q3);
    assert_eq!(reply.sources[0].chunk_id.as_deref(), Some("0"));
}

#[tokio::test]
async fn test_chat_prompt_includes_history_and_context() {
    let harness = Harness::new(MockInferenceBackend::new());
    harness
        .seed_document(DOC_Q3, "Q3 revenue grew 12 percent")
        .await;
    let history = vec![
        ConversationTurn::user("Hi there"),
        ConversationTurn::assistant("Hello! Ask me about your documents."),
    ];

    run(&harness, ResolvedAction::Chat, "Tell me about Q3", &history).await;

    let calls = harness.backend.get_calls();
    let completion = calls.iter().find(|c| c.operation == "complete").unwrap();
    assert!(completion.prompt.contains("[Source: 20250101_120000_q3_report]"));
    assert!(completion.prompt.contains("Hello! Ask me about your documents."));
    assert!(completion.prompt.contains("SOURCES_USED"));
    assert_eq!(completion.input, "Tell me about Q3");
}

#[tokio::test]
async fn test_chat_without_sources_line_reports_none() {
    let harness = Harness::new(MockInferenceBackend::new().with_fixed_response("Just an answer."));
    harness.seed_document(DOC_Q3, "Q3 revenue").await;

    let reply = run(&harness, ResolvedAction::Chat, "Anything?", &[]).await;
    assert_eq!(reply.message, "Just an answer.");
    assert!(reply.sources.is_empty());
}

#[tokio::test]
async fn test_chat_upstream_failure_becomes_apology() {
    let harness = Harness::new(MockInferenceBackend::new().with_failing_completions());

    let reply = run(&harness, ResolvedAction::Chat, "Hello?", &[]).await;
    assert!(reply.message.starts_with("I'm sorry, something went wrong"));
    assert!(reply.sources.is_empty());
}

// =============================================================================
// PDF CREATION
// =============================================================================

#[tokio::test]
async fn test_history_pdf_without_history_is_refused() {
    let harness = Harness::new(MockInferenceBackend::new());
    let action = ResolvedAction::CreatePdf {
        kind: PdfKind::History,
        address: None,
    };

    let reply = run(&harness, action, "Make a PDF of our chat", &[]).await;

    assert!(reply.is_pdf_response);
    assert!(reply.pdf_url.is_none());
    assert!(reply.message.contains("don't have any chat history yet"));
    assert!(harness.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_history_pdf_is_stored_linked_and_emailed() {
    let harness = Harness::new(
        MockInferenceBackend::new()
            .with_completion_rule("professional document summarizer", "## Overview\nWe talked."),
    );
    let history = vec![
        ConversationTurn::user("What is in the Q3 report?"),
        ConversationTurn::assistant("Revenue grew."),
    ];
    let action = ResolvedAction::CreatePdf {
        kind: PdfKind::History,
        address: Some(ADDRESS.to_string()),
    };

    let reply = run(&harness, action, "Email me a PDF of this", &history).await;

    assert!(reply.email_sent);
    assert_eq!(reply.email_address.as_deref(), Some(ADDRESS));
    let url = reply.pdf_url.clone().unwrap();
    assert!(url.starts_with(&format!("{}{}generated_pdfs/", BACKEND_URL, PDF_VIEW_ROUTE)));
    assert!(url.ends_with("_conversation_summary.pdf"));

    let sent = harness.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, ADDRESS);
    assert_eq!(sent[0].subject, "Your Conversation Summary");
    assert!(sent[0].attachments[0].ends_with("_conversation_summary.pdf"));

    // The reply must be recognisable as a generated PDF in later turns
    let next_history = vec![ConversationTurn::assistant(reply.message.clone())];
    let pdfs = ConversationPdfIndex::from_history(&next_history);
    assert_eq!(pdfs.len(), 1);
    let key = &pdfs.records()[0].storage_key;
    assert!(url.ends_with(key.as_str()));

    let stored = harness.store.head_metadata(key).await.unwrap();
    let metadata = PdfMetadata::from_storage_map(&stored).unwrap();
    assert_eq!(metadata.kind, PdfKind::History);
    assert!(metadata.source_document_keys.is_empty());
}

#[tokio::test]
async fn test_content_pdf_records_retrieved_sources() {
    let harness = Harness::new(
        MockInferenceBackend::new()
            .with_completion_rule("Return only the topic", "healthcare policy")
            .with_completion_rule("professional report writer", "# Healthcare\nCoverage expanded."),
    );
    harness
        .seed_document(DOC_HEALTH, "The healthcare policy expanded coverage")
        .await;
    let action = ResolvedAction::CreatePdf {
        kind: PdfKind::VectorContent,
        address: None,
    };

    let reply = run(&harness, action, "Create a PDF about the healthcare policy", &[]).await;

    assert!(!reply.email_sent);
    assert!(reply.message.contains("[Download PDF]("));
    let url = reply.pdf_url.unwrap();
    assert!(url.ends_with("_healthcare_policy_content.pdf"));

    let key = url.split(PDF_VIEW_ROUTE).nth(1).unwrap();
    let stored = harness.store.head_metadata(key).await.unwrap();
    assert_eq!(PdfMetadata::source_documents_from(&stored), vec![DOC_HEALTH.to_string()]);
    assert!(harness.sent().is_empty());
}

#[tokio::test]
async fn test_content_pdf_with_empty_index_is_refused() {
    let harness = Harness::new(
        MockInferenceBackend::new().with_completion_rule("Return only the topic", "mars"),
    );
    let action = ResolvedAction::CreatePdf {
        kind: PdfKind::VectorContent,
        address: None,
    };

    let reply = run(&harness, action, "PDF about mars", &[]).await;
    assert!(reply.message.contains("couldn't find any relevant content"));
    assert!(reply.pdf_url.is_none());
}

#[tokio::test]
async fn test_pdf_with_address_but_no_mailer_still_links() {
    let harness = Harness::without_mailer(
        MockInferenceBackend::new().with_fixed_response("## Overview\nSummary"),
    );
    let history = vec![
        ConversationTurn::user("hi"),
        ConversationTurn::assistant("hello"),
    ];
    let action = ResolvedAction::CreatePdf {
        kind: PdfKind::History,
        address: Some(ADDRESS.to_string()),
    };

    let reply = run(&harness, action, "Email me a summary PDF", &history).await;

    assert!(reply.pdf_url.is_some());
    assert!(!reply.email_sent);
    assert!(reply.message.contains("Email service is not configured"));
}

#[tokio::test]
async fn test_pdf_email_failure_keeps_download_link() {
    let harness = Harness::with_mailer(
        MockInferenceBackend::new().with_fixed_response("## Overview\nSummary"),
        RecordingMailer::failing(),
    );
    let history = vec![
        ConversationTurn::user("hi"),
        ConversationTurn::assistant("hello"),
    ];
    let action = ResolvedAction::CreatePdf {
        kind: PdfKind::History,
        address: Some(ADDRESS.to_string()),
    };

    let reply = run(&harness, action, "Email me a summary PDF", &history).await;

    assert!(!reply.email_sent);
    assert!(reply.message.contains("couldn't send it to erin@example.com"));
    assert!(reply.message.contains("[Download PDF]("));
    assert_eq!(harness.store.list().await.unwrap().len(), 1);
}

// =============================================================================
// SEND DOCUMENTS
// =============================================================================

#[tokio::test]
async fn test_send_documents_filters_by_relevance() {
    let harness = Harness::new(MockInferenceBackend::new().with_completion_rule(
        "document relevance analyzer",
        "RELEVANT_DOCS: 20250102_120000_healthcare_policy",
    ));
    harness
        .seed_document(DOC_HEALTH, "healthcare coverage for employees")
        .await;
    harness
        .seed_document(DOC_CATS, "healthcare for cats and other pets")
        .await;
    let action = ResolvedAction::SendDocuments {
        topic: "healthcare".to_string(),
        address: Some(ADDRESS.to_string()),
    };

    let reply = run(&harness, action, "Send me healthcare documents", &[]).await;

    assert!(reply.is_send_docs_response);
    assert!(reply.email_sent);
    assert_eq!(reply.documents_count, Some(1));
    let sent = harness.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Documents related to: healthcare");
    assert_eq!(sent[0].attachments, vec!["20250102_120000_healthcare_policy.pdf"]);
}

#[tokio::test]
async fn test_send_documents_keeps_all_when_relevance_check_fails() {
    let harness = Harness::new(MockInferenceBackend::new().with_failing_completions());
    harness.seed_document(DOC_HEALTH, "healthcare coverage").await;
    harness.seed_document(DOC_CATS, "healthcare for cats").await;
    let action = ResolvedAction::SendDocuments {
        topic: "healthcare".to_string(),
        address: Some(ADDRESS.to_string()),
    };

    let reply = run(&harness, action, "Send me healthcare documents", &[]).await;

    assert!(reply.email_sent);
    assert_eq!(reply.documents_count, Some(2));
}

#[tokio::test]
async fn test_send_documents_none_relevant() {
    let harness = Harness::new(
        MockInferenceBackend::new()
            .with_completion_rule("document relevance analyzer", "RELEVANT_DOCS: none"),
    );
    harness.seed_document(DOC_CATS, "cats").await;
    let action = ResolvedAction::SendDocuments {
        topic: "tax law".to_string(),
        address: Some(ADDRESS.to_string()),
    };

    let reply = run(&harness, action, "Send me tax law documents", &[]).await;

    assert!(!reply.email_sent);
    assert!(reply.message.contains("couldn't find any that are specifically about 'tax law'"));
    assert!(harness.sent().is_empty());
}

#[tokio::test]
async fn test_send_documents_without_address_asks_for_one() {
    let harness = Harness::new(MockInferenceBackend::new());
    let action = ResolvedAction::SendDocuments {
        topic: "healthcare".to_string(),
        address: None,
    };

    let reply = run(&harness, action, "Send me healthcare documents", &[]).await;

    assert_eq!(reply.awaiting_email_for.as_deref(), Some("send_documents"));
    assert!(reply.message.contains("What email address would you like me to send"));
    assert_eq!(harness.backend.embed_call_count(), 0);
}

#[tokio::test]
async fn test_send_documents_without_mailer() {
    let harness = Harness::without_mailer(MockInferenceBackend::new());
    let action = ResolvedAction::SendDocuments {
        topic: "healthcare".to_string(),
        address: None,
    };

    let reply = run(&harness, action, "Send me healthcare documents", &[]).await;
    assert!(reply.message.contains("Email service is not configured"));
    assert!(reply.awaiting_email_for.is_none());
}

// =============================================================================
// BULK SEND
// =============================================================================

#[tokio::test]
async fn test_bulk_send_last_pdf() {
    let harness = Harness::new(MockInferenceBackend::new());
    harness.seed_generated_pdf(PDF_A, &[]).await;
    harness.seed_generated_pdf(PDF_B, &[]).await;
    let history = history_with_pdfs(&[PDF_B, PDF_A]);
    let action = ResolvedAction::BulkSend {
        selection: PdfSelection::Last,
        count: None,
        address: Some(ADDRESS.to_string()),
    };

    let reply = run(&harness, action, "Send me the last PDF", &history).await;

    assert!(reply.is_bulk_send_response);
    assert_eq!(reply.pdfs_count, Some(1));
    let sent = harness.sent();
    assert_eq!(sent[0].attachments, vec!["20250106_100000_Report_B_content.pdf"]);
    assert_eq!(sent[0].subject, "Your Generated PDFs (1 document(s))");
}

#[tokio::test]
async fn test_bulk_send_last_three_of_five() {
    let harness = Harness::new(MockInferenceBackend::new());
    let keys: Vec<String> = (1..=5)
        .map(|i| format!("generated_pdfs/2025010{}_100000_Report_{}_content.pdf", i, i))
        .collect();
    for key in &keys {
        harness.seed_generated_pdf(key, &[]).await;
    }
    let newest_first: Vec<&str> = keys.iter().rev().map(String::as_str).collect();
    let history = history_with_pdfs(&newest_first);
    let action = ResolvedAction::BulkSend {
        selection: PdfSelection::LastN,
        count: Some(3),
        address: Some(ADDRESS.to_string()),
    };

    let reply = run(&harness, action, "Email me the last 3 PDFs", &history).await;

    assert!(reply.email_sent);
    assert_eq!(reply.pdfs_count, Some(3));
    let sent = harness.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].attachments,
        vec![
            "20250103_100000_Report_3_content.pdf",
            "20250104_100000_Report_4_content.pdf",
            "20250105_100000_Report_5_content.pdf",
        ]
    );
}

#[tokio::test]
async fn test_bulk_send_without_address_asks_for_one() {
    let harness = Harness::new(MockInferenceBackend::new());
    harness.seed_generated_pdf(PDF_A, &[]).await;
    let history = history_with_pdfs(&[PDF_A]);
    let action = ResolvedAction::BulkSend {
        selection: PdfSelection::All,
        count: None,
        address: None,
    };

    let reply = run(&harness, action, "Send me all the PDFs", &history).await;

    assert!(reply.is_bulk_send_response);
    assert_eq!(reply.awaiting_email_for.as_deref(), Some("bulk_send"));
    assert!(reply.message.contains("What email address would you like me to send"));
    assert!(!reply.email_sent);
    assert!(harness.sent().is_empty());
}

#[tokio::test]
async fn test_bulk_send_skips_missing_objects() {
    let harness = Harness::new(MockInferenceBackend::new());
    harness.seed_generated_pdf(PDF_A, &[]).await;
    let history = history_with_pdfs(&[PDF_A, PDF_B]);
    let action = ResolvedAction::BulkSend {
        selection: PdfSelection::All,
        count: None,
        address: Some(ADDRESS.to_string()),
    };

    let reply = run(&harness, action, "Send me all the PDFs", &history).await;

    assert!(reply.email_sent);
    assert_eq!(reply.pdfs_count, Some(1));
    assert_eq!(harness.sent()[0].attachments.len(), 1);
}

#[tokio::test]
async fn test_bulk_send_without_generated_pdfs() {
    let harness = Harness::new(MockInferenceBackend::new());
    let action = ResolvedAction::BulkSend {
        selection: PdfSelection::All,
        count: None,
        address: None,
    };

    let reply = run(&harness, action, "Send me all the PDFs", &[]).await;

    assert!(reply.message.contains("couldn't find any generated PDFs"));
    assert!(reply.awaiting_email_for.is_none());
}

#[tokio::test]
async fn test_bulk_send_invalid_count_is_explained() {
    let harness = Harness::new(MockInferenceBackend::new());
    let history = history_with_pdfs(&[PDF_A]);
    let action = ResolvedAction::BulkSend {
        selection: PdfSelection::LastN,
        count: Some(0),
        address: Some(ADDRESS.to_string()),
    };

    let reply = run(&harness, action, "Send me the last 0 PDFs", &history).await;

    assert!(reply.message.starts_with("I couldn't work out which PDFs you meant"));
    assert!(harness.sent().is_empty());
}

#[tokio::test]
async fn test_bulk_send_mailer_failure_is_reported() {
    let harness = Harness::with_mailer(MockInferenceBackend::new(), RecordingMailer::failing());
    harness.seed_generated_pdf(PDF_A, &[]).await;
    let history = history_with_pdfs(&[PDF_A]);
    let action = ResolvedAction::BulkSend {
        selection: PdfSelection::All,
        count: None,
        address: Some(ADDRESS.to_string()),
    };

    let reply = run(&harness, action, "Send them", &history).await;

    assert!(!reply.email_sent);
    assert!(reply
        .message
        .starts_with("I found the PDFs but couldn't send the email. Error:"));
}

// =============================================================================
// SEND SOURCES
// =============================================================================

#[tokio::test]
async fn test_send_sources_unions_in_order() {
    let harness = Harness::new(MockInferenceBackend::new());
    harness.seed_document(DOC_Q3, "q3").await;
    harness.seed_document(DOC_HEALTH, "health").await;
    harness.seed_generated_pdf(PDF_A, &[DOC_Q3]).await;
    harness.seed_generated_pdf(PDF_B, &[DOC_HEALTH, DOC_Q3]).await;
    let history = history_with_pdfs(&[PDF_A, PDF_B]);
    let action = ResolvedAction::SendSources {
        scope: SourceScope::All,
        count: None,
        address: Some(ADDRESS.to_string()),
    };

    let reply = run(&harness, action, "Send me the source documents", &history).await;

    assert!(reply.is_send_source_docs_response);
    assert_eq!(reply.documents_count, Some(2));
    assert_eq!(
        harness.sent()[0].attachments,
        vec![
            "20250101_120000_q3_report.pdf",
            "20250102_120000_healthcare_policy.pdf"
        ]
    );
}

#[tokio::test]
async fn test_send_sources_last_pdf_only() {
    let harness = Harness::new(MockInferenceBackend::new());
    harness.seed_document(DOC_Q3, "q3").await;
    harness.seed_document(DOC_HEALTH, "health").await;
    harness.seed_generated_pdf(PDF_A, &[DOC_Q3]).await;
    harness.seed_generated_pdf(PDF_B, &[DOC_HEALTH]).await;
    let history = history_with_pdfs(&[PDF_A, PDF_B]);
    let action = ResolvedAction::SendSources {
        scope: SourceScope::LastPdf,
        count: None,
        address: Some(ADDRESS.to_string()),
    };

    let reply = run(&harness, action, "Send the sources for that PDF", &history).await;

    assert_eq!(reply.documents_count, Some(1));
    assert_eq!(
        harness.sent()[0].attachments,
        vec!["20250102_120000_healthcare_policy.pdf"]
    );
}

#[tokio::test]
async fn test_send_sources_for_history_pdf_has_nothing_to_send() {
    let harness = Harness::new(MockInferenceBackend::new());
    harness.seed_generated_pdf(PDF_A, &[]).await;
    let history = history_with_pdfs(&[PDF_A]);
    let action = ResolvedAction::SendSources {
        scope: SourceScope::LastPdf,
        count: None,
        address: Some(ADDRESS.to_string()),
    };

    let reply = run(&harness, action, "Send me its sources", &history).await;

    assert!(reply.message.contains("couldn't find any source documents"));
    assert!(harness.sent().is_empty());
}

#[tokio::test]
async fn test_send_sources_without_address_asks_for_one() {
    let harness = Harness::new(MockInferenceBackend::new());
    let history = history_with_pdfs(&[PDF_A]);
    let action = ResolvedAction::SendSources {
        scope: SourceScope::All,
        count: None,
        address: None,
    };

    let reply = run(&harness, action, "Send me the sources", &history).await;

    assert_eq!(reply.awaiting_email_for.as_deref(), Some("send_sources"));
}
