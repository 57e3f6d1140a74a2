//! Entity extraction from free text and conversation history.
//!
//! Everything here is a pure function over `&str` / `&[ConversationTurn]`;
//! results are recomputed on every request and never persisted.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::models::{display_name, ConversationTurn, GeneratedPdfRecord};

/// Route prefix the UI uses to open a generated PDF.
pub const PDF_VIEW_ROUTE: &str = "/api/pdfs/view/";

/// Link text of the download marker written into assistant turns.
pub const DOWNLOAD_MARKER_LABEL: &str = "Download PDF";

/// Key prefix under which generated PDFs are stored.
pub const GENERATED_PDF_PREFIX: &str = "generated_pdfs/";

/// Fixed phrase the dispatcher uses when it has to ask for an address.
pub const ADDRESS_PROMPT_PHRASE: &str = "What email address would you like me to send";

/// Terms suggesting the user wants something delivered.
pub const SEND_KEYWORDS: &[&str] = &[
    "send", "email", "those", "them", "these", "the pdfs", "the pdf",
];

/// Terms referring to the original files behind a generated PDF.
pub const SOURCE_KEYWORDS: &[&str] = &[
    "source",
    "sources",
    "source documents",
    "original documents",
    "source files",
];

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());

static FULL_EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap());

static GENERATED_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/api/pdfs/view/(generated_pdfs/(\d{8}_\d{6})_[^\s)]+\.pdf)").unwrap()
});

static LAST_N_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\blast\s+(\d+|one|two|three|four|five|six|seven|eight|nine|ten)\b|\b(\d+|one|two|three|four|five|six|seven|eight|nine|ten)\s+(?:most\s+recent|latest|newest)\b",
    )
    .unwrap()
});

/// Return the most recently mentioned email address.
///
/// Turns are scanned newest to oldest; within the newest turn that contains
/// any address, the last address in that turn wins.
pub fn extract_most_recent_email(history: &[ConversationTurn]) -> Option<String> {
    for turn in history.iter().rev() {
        if let Some(found) = EMAIL_RE.find_iter(&turn.content).last() {
            debug!(email = found.as_str(), "Found remembered email in history");
            return Some(found.as_str().to_string());
        }
    }
    None
}

/// Every address in a text, in order of appearance.
pub fn find_emails(text: &str) -> Vec<String> {
    EMAIL_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// True when the text mentions at least one email address.
pub fn contains_email(text: &str) -> bool {
    EMAIL_RE.is_match(text)
}

/// True when the whole (trimmed) string is a single email address.
pub fn is_valid_email(text: &str) -> bool {
    FULL_EMAIL_RE.is_match(text.trim())
}

/// Collect the PDFs generated earlier in the conversation.
///
/// Only assistant turns that carry a download marker are considered. The
/// result follows message order and is not sorted; a key mentioned again in
/// a later turn is recorded once.
pub fn extract_generated_pdfs(history: &[ConversationTurn]) -> Vec<GeneratedPdfRecord> {
    let mut records: Vec<GeneratedPdfRecord> = Vec::new();

    for turn in history.iter().filter(|t| t.is_assistant()) {
        if !has_download_marker(&turn.content) {
            continue;
        }
        for caps in GENERATED_KEY_RE.captures_iter(&turn.content) {
            let storage_key = caps[1].to_string();
            if records.iter().any(|r| r.storage_key == storage_key) {
                trace!(key = %storage_key, "Skipping repeated PDF reference");
                continue;
            }
            records.push(GeneratedPdfRecord {
                file_name: display_name(&storage_key).to_string(),
                timestamp: caps[2].to_string(),
                storage_key,
            });
        }
    }

    debug!(
        pdf_count = records.len(),
        "Extracted generated PDFs from history"
    );
    records
}

/// True when an assistant turn links to a generated PDF.
pub fn has_download_marker(text: &str) -> bool {
    text.contains(DOWNLOAD_MARKER_LABEL) || text.contains(PDF_VIEW_ROUTE)
}

/// Markdown download link for a stored PDF, in the exact shape
/// [`extract_generated_pdfs`] recognises.
pub fn download_marker(backend_url: &str, storage_key: &str) -> String {
    format!(
        "[{}]({}{}{})",
        DOWNLOAD_MARKER_LABEL,
        backend_url.trim_end_matches('/'),
        PDF_VIEW_ROUTE,
        storage_key
    )
}

/// Parse a "last N" style count ("last 3", "last three", "2 most recent").
pub fn extract_last_n_count(message: &str) -> Option<i64> {
    let caps = LAST_N_RE.captures(message)?;
    let token = caps.get(1).or_else(|| caps.get(2))?.as_str();
    parse_count_token(token)
}

fn parse_count_token(token: &str) -> Option<i64> {
    if let Ok(n) = token.parse::<i64>() {
        return Some(n);
    }
    let n = match token.to_lowercase().as_str() {
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        _ => return None,
    };
    Some(n)
}

/// Case-insensitive substring test against a keyword list.
pub fn mentions_any(message: &str, keywords: &[&str]) -> bool {
    let lower = message.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

pub fn mentions_send(message: &str) -> bool {
    mentions_any(message, SEND_KEYWORDS)
}

pub fn mentions_source(message: &str) -> bool {
    mentions_any(message, SOURCE_KEYWORDS)
}

/// True when the dispatcher's address question appears in the text.
pub fn is_address_prompt(text: &str) -> bool {
    text.to_lowercase()
        .contains(&ADDRESS_PROMPT_PHRASE.to_lowercase())
}
