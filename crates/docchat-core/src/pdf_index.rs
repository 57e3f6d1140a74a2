//! PDFs generated earlier in a conversation and the policies for picking
//! a subset of them.

use tracing::debug;

use crate::defaults::THOSE_SCOPE_DEFAULT_COUNT;
use crate::error::{Error, Result};
use crate::extract::extract_generated_pdfs;
use crate::models::{ConversationTurn, GeneratedPdfRecord, PdfSelection, SourceScope};

/// Chronologically ordered view over the PDFs a conversation produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationPdfIndex {
    records: Vec<GeneratedPdfRecord>,
}

impl ConversationPdfIndex {
    /// Build the index from conversation history. Records are sorted by
    /// timestamp; ties keep message order.
    pub fn from_history(history: &[ConversationTurn]) -> Self {
        Self::from_records(extract_generated_pdfs(history))
    }

    pub fn from_records(mut records: Vec<GeneratedPdfRecord>) -> Self {
        // sort_by is stable
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Self { records }
    }

    pub fn has_recent_pdfs(&self) -> bool {
        !self.records.is_empty()
    }

    pub fn records(&self) -> &[GeneratedPdfRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn select(&self, selection: PdfSelection, count: Option<i64>) -> Result<Vec<GeneratedPdfRecord>> {
        select_by_policy(&self.records, selection, count)
    }

    pub fn select_scope(&self, scope: SourceScope, count: Option<i64>) -> Result<Vec<GeneratedPdfRecord>> {
        select_by_scope(&self.records, scope, count)
    }
}

/// Apply a bulk-send selection policy.
///
/// The result is always oldest-first. `LastN` with `n` larger than the
/// available records returns everything.
pub fn select_by_policy(
    records: &[GeneratedPdfRecord],
    selection: PdfSelection,
    count: Option<i64>,
) -> Result<Vec<GeneratedPdfRecord>> {
    if records.is_empty() {
        return Err(Error::InvalidSelection(
            "no generated PDFs in this conversation".to_string(),
        ));
    }

    let mut ordered = records.to_vec();
    ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    let selected = match selection {
        PdfSelection::All => ordered,
        PdfSelection::Last => ordered.split_off(ordered.len() - 1),
        PdfSelection::LastN => {
            let n = match count {
                Some(n) if n > 0 => n as usize,
                Some(n) => {
                    return Err(Error::InvalidSelection(format!(
                        "last_n requires a positive count, got {}",
                        n
                    )))
                }
                None => {
                    return Err(Error::InvalidSelection(
                        "last_n requires a count".to_string(),
                    ))
                }
            };
            let start = ordered.len().saturating_sub(n);
            ordered.split_off(start)
        }
    };

    debug!(
        selection = selection.as_str(),
        available = records.len(),
        selected = selected.len(),
        "Selected generated PDFs"
    );
    Ok(selected)
}

/// Map a source-documents scope onto a selection policy and apply it.
pub fn select_by_scope(
    records: &[GeneratedPdfRecord],
    scope: SourceScope,
    count: Option<i64>,
) -> Result<Vec<GeneratedPdfRecord>> {
    let (selection, count) = match scope {
        SourceScope::All => (PdfSelection::All, None),
        SourceScope::LastPdf => (PdfSelection::Last, None),
        SourceScope::Those => (
            PdfSelection::LastN,
            Some(count.unwrap_or(THOSE_SCOPE_DEFAULT_COUNT)),
        ),
        SourceScope::LastNPdfs => (PdfSelection::LastN, count),
    };
    select_by_policy(records, selection, count)
}
