use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use decant_decode::DecodedTable;
use decant_mapping::Issue;

/// Accumulated outcome of one validation run. Produced for the caller
/// (UI, CLI) and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<Issue>,
    pub test_results: TestResults,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub robust_parsing: Option<RobustParsing>,
}

/// Per-row and per-column conversion outcomes across every level that ran.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestResults {
    pub rows_processed: usize,
    pub successful_conversions: usize,
    pub failed_conversions: usize,
    pub column_tests: BTreeMap<String, ColumnTest>,
}

/// Conversion counts for one mapped field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnTest {
    pub source_column: String,
    pub success: usize,
    pub failure: usize,
    pub success_rate: f64,
}

impl ColumnTest {
    pub fn record(&mut self, ok: bool) {
        if ok {
            self.success += 1;
        } else {
            self.failure += 1;
        }
        let total = self.success + self.failure;
        self.success_rate = if total == 0 {
            0.0
        } else {
            self.success as f64 / total as f64
        };
    }
}

/// Decoder diagnostics surfaced verbatim by Level-4 file validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobustParsing {
    pub encoding_detected: String,
    pub confidence: f32,
    pub malformed_rows_filtered: usize,
    pub header_row_index: usize,
    pub rows_decoded: usize,
}

impl From<&DecodedTable> for RobustParsing {
    fn from(table: &DecodedTable) -> Self {
        RobustParsing {
            encoding_detected: table.encoding_detected.clone(),
            confidence: table.confidence,
            malformed_rows_filtered: table.malformed_rows_filtered,
            header_row_index: table.header_row_index,
            rows_decoded: table.rows.len(),
        }
    }
}
