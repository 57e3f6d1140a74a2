use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use docchat_core::defaults::SHORT_HISTORY_EXCHANGES;
use docchat_core::{EmailIntent, Result};

use super::{
    clean_address, history_section, object_schema, parse_fields, remembered_section,
    ClassificationContext, IntentPrompt,
};

/// Does the user want something emailed, and to which address?
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailIntentPrompt;

#[derive(Deserialize)]
struct Raw {
    wants_email: bool,
    email_address: Option<String>,
}

impl IntentPrompt for EmailIntentPrompt {
    type Output = EmailIntent;

    const NAME: &'static str = "email_intent";
    const HISTORY_EXCHANGES: usize = SHORT_HISTORY_EXCHANGES;

    fn system_prompt(&self) -> &'static str {
        "You are an email intent detector. Extract email addresses accurately. \
         Use conversation context and the remembered email when appropriate."
    }

    fn user_prompt(&self, ctx: &ClassificationContext<'_>, history: &str) -> String {
        format!(
            r#"You are an email intent detector.
{}{}
Analyze this user message and determine:
1. Does the user want to EMAIL something (not just create or download it)?
2. If yes, which email address should it go to?
3. Use the conversation history if the user says "it" or "that".
4. If the user says "email me" or "send to me" without an address, use the REMEMBERED EMAIL if available.

Current user message: "{}"

Set wants_email to true only when the user asks for delivery by email.
Set email_address to the address, or null if none is known.

Examples:
- "Send the PDF to john@example.com" -> wants_email: true, email_address: "john@example.com"
- "Create a PDF and email it to me at user@domain.org" -> wants_email: true, email_address: "user@domain.org"
- Remembered email "alex@test.com", "Email me that" -> wants_email: true, email_address: "alex@test.com"
- "Email it to me" with no remembered email -> wants_email: true, email_address: null
- "Create a PDF of our conversation" -> wants_email: false, email_address: null
"#,
            history_section(history),
            remembered_section(ctx),
            ctx.message
        )
    }

    fn schema(&self) -> JsonValue {
        object_schema(json!({
            "wants_email": {"type": "boolean"},
            "email_address": {"type": ["string", "null"]}
        }))
    }

    fn parse(&self, value: JsonValue, _ctx: &ClassificationContext<'_>) -> Result<EmailIntent> {
        let raw: Raw = parse_fields(Self::NAME, value)?;
        if !raw.wants_email {
            return Ok(EmailIntent::default());
        }
        Ok(EmailIntent {
            wants_email: true,
            address: clean_address(Self::NAME, raw.email_address),
        })
    }
}
