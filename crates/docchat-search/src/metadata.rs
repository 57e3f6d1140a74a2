//! Metadata keys stored alongside every chunk vector.

use serde_json::{json, Map, Value as JsonValue};

/// Object-store key of the uploaded document.
pub const FILE_NAME: &str = "file_name";
/// Position of the chunk within its document.
pub const CHUNK_ID: &str = "chunk_id";
/// The chunk's text; returned as [`docchat_core::SearchMatch::text`].
pub const CHUNK_TEXT: &str = "chunk_text";
/// Approximate token count of the chunk.
pub const TOKEN_COUNT: &str = "token_count";

/// Metadata map for one chunk.
pub fn chunk_metadata(
    file_name: &str,
    chunk_id: usize,
    text: &str,
    token_count: usize,
) -> Map<String, JsonValue> {
    let mut map = Map::new();
    map.insert(FILE_NAME.to_string(), json!(file_name));
    map.insert(CHUNK_ID.to_string(), json!(chunk_id));
    map.insert(CHUNK_TEXT.to_string(), json!(text));
    map.insert(TOKEN_COUNT.to_string(), json!(token_count));
    map
}

/// Chunk text stored in a metadata map, empty when absent.
pub fn chunk_text(metadata: &Map<String, JsonValue>) -> String {
    metadata
        .get(CHUNK_TEXT)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchat_core::SearchMatch;

    #[test]
    fn test_chunk_metadata_readable_by_search_match() {
        let metadata = chunk_metadata("pdfs/report.pdf", 3, "hello", 2);
        let m = SearchMatch {
            id: "x".to_string(),
            text: chunk_text(&metadata),
            score: 0.5,
            metadata,
        };
        assert_eq!(m.file_name(), Some("pdfs/report.pdf"));
        assert_eq!(m.chunk_id().as_deref(), Some("3"));
        assert_eq!(m.text, "hello");
    }

    #[test]
    fn test_chunk_text_missing() {
        assert_eq!(chunk_text(&Map::new()), "");
    }
}
