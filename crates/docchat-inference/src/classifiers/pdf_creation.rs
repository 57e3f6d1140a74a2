use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use docchat_core::defaults::SHORT_HISTORY_EXCHANGES;
use docchat_core::{PdfCreationIntent, PdfRequestKind, Result};

use super::{history_section, object_schema, parse_fields, ClassificationContext, IntentPrompt};

/// Should a PDF be created, and from what: the conversation or the documents?
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfCreationPrompt;

#[derive(Deserialize)]
struct Raw {
    intent: PdfRequestKind,
}

impl IntentPrompt for PdfCreationPrompt {
    type Output = PdfCreationIntent;

    const NAME: &'static str = "pdf_creation_intent";
    const HISTORY_EXCHANGES: usize = SHORT_HISTORY_EXCHANGES;

    fn system_prompt(&self) -> &'static str {
        "You are a precise intent classifier for a document chatbot. Use conversation context."
    }

    fn user_prompt(&self, ctx: &ClassificationContext<'_>, history: &str) -> String {
        let previous = ctx
            .previous_turn()
            .map(|t| format!("\nPREVIOUS MESSAGE ({}): {}\n", t.role.label(), t.content))
            .unwrap_or_default();

        format!(
            r#"You are an intent classifier for a document chatbot system.
{}{}
Analyze the user's message and determine their intent. If the user says "it", "that" or "this", resolve it against the previous message.

Current user message: "{}"

Choose exactly one intent:
- "history": the user wants a PDF of the conversation itself
- "vector_content": the user wants a PDF built from document content or search results
- "chat": the user wants a normal answer, not a PDF

Examples:
- "Create a PDF of our conversation" -> history
- "Export this chat to PDF" -> history
- "Generate a PDF from the documents about healthcare" -> vector_content
- Previous: "Tell me about Alex's skills", Current: "Create a PDF about that" -> vector_content
- "What companies are mentioned?" -> chat
- "Send me the last PDF" -> chat (sending an existing PDF is not creating one)
"#,
            history_section(history),
            previous,
            ctx.message
        )
    }

    fn schema(&self) -> JsonValue {
        object_schema(json!({
            "intent": {"type": "string", "enum": ["history", "vector_content", "chat"]}
        }))
    }

    fn parse(
        &self,
        value: JsonValue,
        _ctx: &ClassificationContext<'_>,
    ) -> Result<PdfCreationIntent> {
        let raw: Raw = parse_fields(Self::NAME, value)?;
        Ok(PdfCreationIntent {
            wants_pdf: raw.intent != PdfRequestKind::Chat,
            kind: raw.intent,
        })
    }
}
