use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use docchat_core::defaults::LONG_HISTORY_EXCHANGES;
use docchat_core::extract::{extract_last_n_count, mentions_source};
use docchat_core::{Error, Result, SendSourcesIntent, SourceScope};

use super::{
    clean_address, generated_pdfs_section, history_section, object_schema, parse_fields,
    remembered_section, ClassificationContext, IntentPrompt,
};

/// Does the user want the original documents behind generated PDFs?
///
/// Only consulted when the message itself mentions sources; otherwise the
/// classifier answers "no intent" without calling the model.
#[derive(Debug, Clone, Copy, Default)]
pub struct SendSourcesPrompt;

#[derive(Deserialize)]
struct Raw {
    wants_sources: bool,
    email_address: Option<String>,
    scope: SourceScope,
    count: Option<i64>,
}

impl IntentPrompt for SendSourcesPrompt {
    type Output = SendSourcesIntent;

    const NAME: &'static str = "send_sources_intent";
    const HISTORY_EXCHANGES: usize = LONG_HISTORY_EXCHANGES;

    fn precondition(&self, ctx: &ClassificationContext<'_>) -> bool {
        mentions_source(ctx.message)
    }

    fn system_prompt(&self) -> &'static str {
        "You detect requests for the original source documents that generated PDFs were built from."
    }

    fn user_prompt(&self, ctx: &ClassificationContext<'_>, history: &str) -> String {
        format!(
            r#"You detect whether the user wants the SOURCE DOCUMENTS (the original uploaded files) behind PDFs generated in this conversation.
{}{}{}
Current user message: "{}"

Decide:
- wants_sources: true if the user asks for the source, original or underlying documents of generated PDFs
- scope: "all" for every generated PDF, "last_pdf" for the most recent one, "those" for the PDFs just discussed, "last_n_pdfs" for the most recent N
- count: N for "last_n_pdfs" (or for "those" when a number is given), otherwise null
- email_address: the destination, the REMEMBERED EMAIL for "email me", or null if unknown

Examples:
- "Send me the source documents for that PDF" -> wants_sources: true, scope: "last_pdf"
- "Email the sources of those to bob@x.com" -> wants_sources: true, scope: "those", email_address: "bob@x.com"
- "Send the original documents for the last 2 PDFs" -> wants_sources: true, scope: "last_n_pdfs", count: 2
- "What sources did you use?" -> wants_sources: false (a question, not a send request)
"#,
            history_section(history),
            generated_pdfs_section(ctx),
            remembered_section(ctx),
            ctx.message
        )
    }

    fn schema(&self) -> JsonValue {
        object_schema(json!({
            "wants_sources": {"type": "boolean"},
            "email_address": {"type": ["string", "null"]},
            "scope": {"type": "string", "enum": ["all", "last_pdf", "those", "last_n_pdfs"]},
            "count": {"type": ["integer", "null"]}
        }))
    }

    fn parse(
        &self,
        value: JsonValue,
        ctx: &ClassificationContext<'_>,
    ) -> Result<SendSourcesIntent> {
        let raw: Raw = parse_fields(Self::NAME, value)?;
        if !raw.wants_sources {
            return Ok(SendSourcesIntent::default());
        }

        let given = raw.count.filter(|n| *n > 0);
        let count = match raw.scope {
            SourceScope::LastNPdfs => Some(
                given
                    .or_else(|| extract_last_n_count(ctx.message))
                    .ok_or_else(|| {
                        Error::MalformedClassifierOutput(format!(
                            "{}: last_n_pdfs without a count",
                            Self::NAME
                        ))
                    })?,
            ),
            SourceScope::Those => given,
            SourceScope::All | SourceScope::LastPdf => None,
        };

        Ok(SendSourcesIntent {
            wants_sources: true,
            address: clean_address(Self::NAME, raw.email_address),
            scope: raw.scope,
            count,
        })
    }
}
