use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use docchat_core::defaults::LONG_HISTORY_EXCHANGES;
use docchat_core::extract::extract_last_n_count;
use docchat_core::{BulkSendIntent, Error, PdfSelection, Result};

use super::{
    clean_address, generated_pdfs_section, history_section, object_schema, parse_fields,
    remembered_section, ClassificationContext, IntentPrompt,
};

/// Does the user want PDFs generated earlier in this conversation sent?
#[derive(Debug, Clone, Copy, Default)]
pub struct BulkSendPrompt;

#[derive(Deserialize)]
struct Raw {
    wants_bulk_send: bool,
    email_address: Option<String>,
    selection: PdfSelection,
    count: Option<i64>,
}

impl IntentPrompt for BulkSendPrompt {
    type Output = BulkSendIntent;

    const NAME: &'static str = "bulk_send_intent";
    const HISTORY_EXCHANGES: usize = LONG_HISTORY_EXCHANGES;

    fn system_prompt(&self) -> &'static str {
        "You detect requests to send previously generated PDFs. \
         Distinguish them from requests for new PDFs or for uploaded documents."
    }

    fn user_prompt(&self, ctx: &ClassificationContext<'_>, history: &str) -> String {
        format!(
            r#"You detect whether the user wants PDFs that were ALREADY GENERATED in this conversation sent to them.
{}{}{}
Current user message: "{}"

Decide:
- wants_bulk_send: true if the user wants one or more of the generated PDFs above emailed or sent
- selection: "all" for every generated PDF, "last" for the most recent one, "last_n" for the most recent N
- count: N when selection is "last_n", otherwise null
- email_address: the destination, the REMEMBERED EMAIL for "email me", or null if unknown

Examples:
- "Send me all the PDFs" -> wants_bulk_send: true, selection: "all"
- "Email those to bob@x.com" -> wants_bulk_send: true, selection: "all", email_address: "bob@x.com"
- "Send me the last PDF" -> wants_bulk_send: true, selection: "last"
- "Email me the last 3 PDFs" -> wants_bulk_send: true, selection: "last_n", count: 3
- "Create a PDF about healthcare" -> wants_bulk_send: false
- "Send me documents about healthcare" -> wants_bulk_send: false (uploaded documents, not generated PDFs)
"#,
            history_section(history),
            generated_pdfs_section(ctx),
            remembered_section(ctx),
            ctx.message
        )
    }

    fn schema(&self) -> JsonValue {
        object_schema(json!({
            "wants_bulk_send": {"type": "boolean"},
            "email_address": {"type": ["string", "null"]},
            "selection": {"type": "string", "enum": ["all", "last_n", "last"]},
            "count": {"type": ["integer", "null"]}
        }))
    }

    fn parse(&self, value: JsonValue, ctx: &ClassificationContext<'_>) -> Result<BulkSendIntent> {
        let raw: Raw = parse_fields(Self::NAME, value)?;
        if !raw.wants_bulk_send {
            return Ok(BulkSendIntent::default());
        }

        let count = match raw.selection {
            PdfSelection::LastN => Some(
                raw.count
                    .filter(|n| *n > 0)
                    .or_else(|| extract_last_n_count(ctx.message))
                    .ok_or_else(|| {
                        Error::MalformedClassifierOutput(format!(
                            "{}: last_n without a count",
                            Self::NAME
                        ))
                    })?,
            ),
            PdfSelection::All | PdfSelection::Last => None,
        };

        Ok(BulkSendIntent {
            wants_bulk_send: true,
            address: clean_address(Self::NAME, raw.email_address),
            selection: raw.selection,
            count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchat_core::GeneratedPdfRecord;

    fn parse_for(message: &str, value: JsonValue) -> Result<BulkSendIntent> {
        let ctx = ClassificationContext::new(message, &[]);
        BulkSendPrompt.parse(value, &ctx)
    }

    #[test]
    fn test_parse_last_n_with_count() {
        let intent = parse_for(
            "email me the last 2",
            json!({"wants_bulk_send": true, "email_address": "a@b.com", "selection": "last_n", "count": 2}),
        )
        .unwrap();
        assert_eq!(intent.selection, PdfSelection::LastN);
        assert_eq!(intent.count, Some(2));
        assert_eq!(intent.address.as_deref(), Some("a@b.com"));
    }

    #[test]
    fn test_parse_last_n_falls_back_to_message_count() {
        let intent = parse_for(
            "Email me the last three PDFs",
            json!({"wants_bulk_send": true, "email_address": null, "selection": "last_n", "count": null}),
        )
        .unwrap();
        assert_eq!(intent.count, Some(3));
    }

    #[test]
    fn test_parse_last_n_without_any_count_is_malformed() {
        let result = parse_for(
            "send the recent ones",
            json!({"wants_bulk_send": true, "email_address": null, "selection": "last_n", "count": null}),
        );
        assert!(matches!(result, Err(Error::MalformedClassifierOutput(_))));
    }

    #[test]
    fn test_parse_all_drops_count() {
        let intent = parse_for(
            "send them all",
            json!({"wants_bulk_send": true, "email_address": null, "selection": "all", "count": 7}),
        )
        .unwrap();
        assert_eq!(intent.selection, PdfSelection::All);
        assert_eq!(intent.count, None);
    }

    #[test]
    fn test_parse_bad_selection_is_malformed() {
        let result = parse_for(
            "send",
            json!({"wants_bulk_send": true, "email_address": null, "selection": "first", "count": null}),
        );
        assert!(matches!(result, Err(Error::MalformedClassifierOutput(_))));
    }

    #[test]
    fn test_prompt_lists_generated_pdfs() {
        let pdfs = vec![GeneratedPdfRecord {
            storage_key: "generated_pdfs/20250101_100000_a.pdf".to_string(),
            timestamp: "20250101_100000".to_string(),
            file_name: "20250101_100000_a.pdf".to_string(),
        }];
        let ctx = ClassificationContext::new("send those", &[]).with_generated_pdfs(&pdfs);
        let prompt = BulkSendPrompt.user_prompt(&ctx, "");
        assert!(prompt.contains("1. 20250101_100000_a.pdf (created 20250101_100000)"));
    }
}
