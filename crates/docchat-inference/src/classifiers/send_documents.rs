use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use docchat_core::defaults::LONG_HISTORY_EXCHANGES;
use docchat_core::{Error, Result, SendDocumentsIntent};

use super::{
    clean_address, history_section, object_schema, parse_fields, remembered_section,
    ClassificationContext, IntentPrompt,
};

/// Does the user want uploaded documents about a topic emailed to them?
#[derive(Debug, Clone, Copy, Default)]
pub struct SendDocumentsPrompt;

#[derive(Deserialize)]
struct Raw {
    wants_send_docs: bool,
    email_address: Option<String>,
    topic: Option<String>,
}

impl IntentPrompt for SendDocumentsPrompt {
    type Output = SendDocumentsIntent;

    const NAME: &'static str = "send_documents_intent";
    const HISTORY_EXCHANGES: usize = LONG_HISTORY_EXCHANGES;

    fn system_prompt(&self) -> &'static str {
        "You are an intent detector for a document management system. \
         Extract email addresses and topics accurately."
    }

    fn user_prompt(&self, ctx: &ClassificationContext<'_>, history: &str) -> String {
        format!(
            r#"You are an intent detector for a document management system.
{}{}
Analyze this user message and determine:
1. Does the user want existing UPLOADED documents sent or emailed to them (not a new PDF created)?
2. If yes, which email address? Use the REMEMBERED EMAIL if they say "email me" without one.
3. What topic are the documents about? Resolve "it", "that" or "them" from the conversation history.

Current user message: "{}"

Examples:
- "Send me all documents relating to CaseBase to alex@email.com" -> wants_send_docs: true, email_address: "alex@email.com", topic: "CaseBase"
- "Email me documents about the resumes" with remembered "john@test.com" -> wants_send_docs: true, email_address: "john@test.com", topic: "resumes"
- Previous: "Tell me about healthcare docs", Current: "Send them to alex@email.com" -> wants_send_docs: true, email_address: "alex@email.com", topic: "healthcare"
- "Create a PDF about Alex" -> wants_send_docs: false (creating a PDF is not sending documents)
- "What documents do you have?" -> wants_send_docs: false (asking, not sending)
- "Send me the PDFs you made" -> wants_send_docs: false (generated PDFs are not uploaded documents)

Use null for email_address and topic when they are unknown.
"#,
            history_section(history),
            remembered_section(ctx),
            ctx.message
        )
    }

    fn schema(&self) -> JsonValue {
        object_schema(json!({
            "wants_send_docs": {"type": "boolean"},
            "email_address": {"type": ["string", "null"]},
            "topic": {"type": ["string", "null"]}
        }))
    }

    fn parse(
        &self,
        value: JsonValue,
        _ctx: &ClassificationContext<'_>,
    ) -> Result<SendDocumentsIntent> {
        let raw: Raw = parse_fields(Self::NAME, value)?;
        if !raw.wants_send_docs {
            return Ok(SendDocumentsIntent::default());
        }

        let topic = raw
            .topic
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                Error::MalformedClassifierOutput(format!(
                    "{}: wants_send_docs without a topic",
                    Self::NAME
                ))
            })?;

        Ok(SendDocumentsIntent {
            wants_send_docs: true,
            address: clean_address(Self::NAME, raw.email_address),
            topic: Some(topic),
        })
    }
}
