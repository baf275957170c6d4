use serde::{Deserialize, Serialize};

/// Decoder-side knowledge about a source's file shape: how to find the real
/// header among preamble lines, which columns a usable row must carry, and
/// (optionally) a pinned encoding that skips detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderMetadata {
    /// Ordered candidate header patterns; the first pattern that matches a
    /// line, in file order, wins. Each pattern is an ordered list of column
    /// names compared case-insensitively.
    #[serde(default)]
    pub header_match: Vec<Vec<String>>,
    /// Columns that must be present for a file to be processable.
    #[serde(default)]
    pub required_columns: Vec<String>,
    /// Minimum field count for a data row to be considered well-formed.
    #[serde(default)]
    pub min_row_fields: usize,
    /// Pinned encoding label (e.g. "utf-8", "latin-1"); skips detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

impl Default for DecoderMetadata {
    fn default() -> Self {
        DecoderMetadata {
            header_match: Vec::new(),
            required_columns: Vec::new(),
            min_row_fields: 0,
            encoding: None,
        }
    }
}

impl DecoderMetadata {
    /// Metadata whose only header pattern is the given column list, requiring
    /// the same columns in every row.
    pub fn for_columns(columns: &[&str]) -> Self {
        let cols: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        DecoderMetadata {
            header_match: vec![cols.clone()],
            min_row_fields: cols.len(),
            required_columns: cols,
            encoding: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip() {
        let meta = DecoderMetadata {
            header_match: vec![vec!["Date".into(), "Amount".into()]],
            required_columns: vec!["Date".into(), "Amount".into()],
            min_row_fields: 2,
            encoding: Some("utf-8".into()),
        };
        let json = serde_json::to_string(&meta).unwrap();
        let back: DecoderMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn missing_fields_default() {
        let meta: DecoderMetadata = serde_json::from_str("{}").unwrap();
        assert!(meta.header_match.is_empty());
        assert_eq!(meta.min_row_fields, 0);
        assert!(meta.encoding.is_none());
    }
}
