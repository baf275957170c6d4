use std::collections::{BTreeMap, HashSet};

use decant_core::amount::{parse_amount, AmountFormat};
use decant_core::date::{is_plausible, parse_date, DateFormat};
use decant_decode::{decode, DecodeError};
use decant_mapping::{FixAction, Issue, SourceMappingConfig};

use crate::report::{ColumnTest, RobustParsing, TestResults, ValidationResult};

/// Columns converting fewer than this fraction of sampled values get a
/// warning; the mapping is still usable, the data is suspect.
const SUCCESS_RATE_WARNING_THRESHOLD: f64 = 0.8;

/// Below this the detected encoding is a guess worth pinning explicitly.
const ENCODING_CONFIDENCE_WARNING: f32 = 0.8;

/// Runs a mapping configuration through up to four levels of checks:
/// structure, format declarations, sample-row conversion, and (when file
/// bytes are supplied) a full decode of the real file. Structural failures
/// stop the run; nothing later is meaningful against a broken mapping.
#[derive(Debug, Default)]
pub struct ValidationEngine;

struct ResolvedFormats {
    date: Option<DateFormat>,
    amount: AmountFormat,
}

impl ValidationEngine {
    pub fn new() -> Self {
        ValidationEngine
    }

    /// Validate a configuration on its own, using its `example_data` rows
    /// as the conversion sample.
    pub fn validate_config(&self, config: &SourceMappingConfig) -> ValidationResult {
        tracing::info!("validating mapping for source '{}'", config.source_id);
        let mut result = ValidationResult::default();

        if !self.run_structural(config, &mut result) {
            result.valid = false;
            return result;
        }
        let formats = self.resolve_formats(config, &mut result);
        self.test_rows(config, &formats, &config.example_data, &mut result.test_results);

        self.finish(&mut result);
        result
    }

    /// Validate a configuration against an actual file: everything
    /// [`validate_config`](Self::validate_config) does, plus a real decode
    /// whose diagnostics land in `robust_parsing` and whose rows join the
    /// conversion sample.
    pub fn validate_file(&self, config: &SourceMappingConfig, bytes: &[u8]) -> ValidationResult {
        tracing::info!(
            "validating mapping for source '{}' against a {}-byte file",
            config.source_id,
            bytes.len()
        );
        let mut result = ValidationResult::default();

        if !self.run_structural(config, &mut result) {
            result.valid = false;
            return result;
        }
        let formats = self.resolve_formats(config, &mut result);
        self.test_rows(config, &formats, &config.example_data, &mut result.test_results);

        match decode(bytes, &config.metadata) {
            Ok(table) => {
                result.robust_parsing = Some(RobustParsing::from(&table));

                if table.malformed_rows_filtered > 0 {
                    result.warnings.push(format!(
                        "{} malformed rows were filtered out while decoding the file",
                        table.malformed_rows_filtered
                    ));
                }
                if table.confidence < ENCODING_CONFIDENCE_WARNING {
                    result.warnings.push(format!(
                        "encoding detected as {} with low confidence ({:.2})",
                        table.encoding_detected, table.confidence
                    ));
                    result.issues.push(Issue::fixable(
                        format!(
                            "encoding detection confidence is only {:.2}",
                            table.confidence
                        ),
                        format!(
                            "pin the '{}' encoding in the decoder metadata",
                            table.encoding_detected
                        ),
                        FixAction::PinEncoding {
                            encoding: table.encoding_detected.clone(),
                        },
                    ));
                }

                // Required means both the config's required_columns list and
                // every mapping flagged required.
                let mut required: Vec<&str> =
                    config.required_columns.iter().map(String::as_str).collect();
                for mapping in config.all_mappings() {
                    if mapping.required && !required.contains(&mapping.source_column.as_str()) {
                        required.push(&mapping.source_column);
                    }
                }
                for col in required {
                    if table.column_index(col).is_none() {
                        result
                            .errors
                            .push(format!("required column '{col}' not found in file"));
                        result.issues.push(Issue::unfixable(
                            format!("required column '{col}' not found in file"),
                            "re-export the file with this column or remap it",
                        ));
                    }
                }
                for mapping in &config.optional_mappings {
                    if table.column_index(&mapping.source_column).is_none() {
                        result.warnings.push(format!(
                            "optional column '{}' not present in file",
                            mapping.source_column
                        ));
                    }
                }

                let rows: Vec<BTreeMap<String, String>> = table
                    .rows
                    .iter()
                    .map(|row| {
                        table
                            .headers
                            .iter()
                            .cloned()
                            .zip(row.iter().cloned())
                            .collect()
                    })
                    .collect();
                self.test_rows(config, &formats, &rows, &mut result.test_results);
            }
            Err(DecodeError::MissingRequiredColumns { columns }) => {
                for col in columns {
                    result
                        .errors
                        .push(format!("required column '{col}' not found in file"));
                    result.issues.push(Issue::unfixable(
                        format!("required column '{col}' not found in file"),
                        "re-export the file with this column or remap it",
                    ));
                }
            }
            Err(err) => {
                result.errors.push(format!("file decode failed: {err}"));
            }
        }

        self.finish(&mut result);
        result
    }

    fn run_structural(&self, config: &SourceMappingConfig, result: &mut ValidationResult) -> bool {
        let (valid, errors) = config.is_structurally_valid();
        result.errors.extend(errors);
        result.warnings.extend(config.structural_warnings());
        result.issues.extend(structural_issues(config));
        valid
    }

    fn resolve_formats(
        &self,
        config: &SourceMappingConfig,
        result: &mut ValidationResult,
    ) -> ResolvedFormats {
        let date_name = config.date_mapping.date_format.as_deref().unwrap_or("");
        let date = match date_name.parse::<DateFormat>() {
            Ok(format) => Some(format),
            Err(_) => {
                result
                    .errors
                    .push(format!("unknown date format '{date_name}'"));
                None
            }
        };

        let amount_name = config.amount_mapping.amount_format.as_deref().unwrap_or("");
        let amount = match amount_name.parse::<AmountFormat>() {
            Ok(format) => format,
            Err(_) => {
                result.warnings.push(format!(
                    "unknown amount format '{amount_name}'; testing values against USD conventions"
                ));
                AmountFormat::Usd
            }
        };

        ResolvedFormats { date, amount }
    }

    /// Try every mapped conversion on each sample row, counting outcomes
    /// per column. A row is a successful conversion only if all three core
    /// fields convert.
    fn test_rows(
        &self,
        config: &SourceMappingConfig,
        formats: &ResolvedFormats,
        rows: &[BTreeMap<String, String>],
        results: &mut TestResults,
    ) {
        for row in rows {
            let mut row_ok = true;

            if let Some(format) = formats.date {
                let ok = cell(row, &config.date_mapping.source_column)
                    .filter(|v| !v.trim().is_empty())
                    .and_then(|v| parse_date(v, format).ok())
                    .is_some_and(is_plausible);
                record(results, "date", &config.date_mapping.source_column, ok);
                row_ok &= ok;
            }

            let ok = cell(row, &config.description_mapping.source_column)
                .is_some_and(|v| !v.trim().is_empty());
            record(
                results,
                "description",
                &config.description_mapping.source_column,
                ok,
            );
            row_ok &= ok;

            let ok = cell(row, &config.amount_mapping.source_column)
                .and_then(|v| parse_amount(v, formats.amount).ok())
                .is_some();
            record(results, "amount", &config.amount_mapping.source_column, ok);
            row_ok &= ok;

            // Optional columns carry no format; presence in the sample is
            // enough. Absent keys are reported elsewhere, not counted here.
            for mapping in &config.optional_mappings {
                if cell(row, &mapping.source_column).is_some() {
                    record(
                        results,
                        &format!("optional_{}", mapping.target_field),
                        &mapping.source_column,
                        true,
                    );
                }
            }

            results.rows_processed += 1;
            if row_ok {
                results.successful_conversions += 1;
            } else {
                results.failed_conversions += 1;
            }
        }
    }

    /// Success-rate warnings are computed once here, from the final counts,
    /// so sample rows and decoded file rows share one verdict per column.
    fn finish(&self, result: &mut ValidationResult) {
        let mut rate_warnings = Vec::new();
        for (field, test) in &result.test_results.column_tests {
            if test.success + test.failure > 0
                && test.success_rate < SUCCESS_RATE_WARNING_THRESHOLD
            {
                rate_warnings.push(format!(
                    "column '{}' ({field}) converted only {:.0}% of sampled values",
                    test.source_column,
                    test.success_rate * 100.0
                ));
            }
        }
        result.warnings.extend(rate_warnings);

        let mut seen = HashSet::new();
        result.errors.retain(|e| seen.insert(e.clone()));
        result.valid = result.errors.is_empty();
    }
}

fn cell<'a>(row: &'a BTreeMap<String, String>, column: &str) -> Option<&'a str> {
    row.get(column).map(String::as_str).or_else(|| {
        row.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(column))
            .map(|(_, value)| value.as_str())
    })
}

fn record(results: &mut TestResults, field: &str, source_column: &str, ok: bool) {
    results
        .column_tests
        .entry(field.to_string())
        .or_insert_with(|| ColumnTest {
            source_column: source_column.to_string(),
            ..Default::default()
        })
        .record(ok);
}

/// Re-derive structural findings as tagged issues so the caller can offer
/// one-click repairs where a mechanical fix exists.
fn structural_issues(config: &SourceMappingConfig) -> Vec<Issue> {
    let mut issues = Vec::new();
    let expected: HashSet<&str> = config.expected_columns.iter().map(String::as_str).collect();

    let mut missing: Vec<String> = Vec::new();
    for mapping in config.all_mappings() {
        let col = mapping.source_column.as_str();
        if col.trim().is_empty() {
            issues.push(Issue::unfixable(
                format!("mapping for '{}' has no source column", mapping.target_field),
                "set the source column this field should read from",
            ));
        } else if !expected.contains(col) && !missing.iter().any(|c| c == col) {
            missing.push(col.to_string());
        }
    }
    for col in &config.required_columns {
        if !expected.contains(col.as_str()) && !missing.contains(col) {
            missing.push(col.clone());
        }
    }
    if !missing.is_empty() {
        issues.push(Issue::fixable(
            format!("columns {missing:?} are referenced but not listed in expected_columns"),
            "add them to expected_columns",
            FixAction::AddExpectedColumns { columns: missing },
        ));
    }

    let mut seen = HashSet::new();
    for mapping in config.all_mappings() {
        let col = mapping.source_column.as_str();
        if !col.trim().is_empty() && !seen.insert(col) {
            issues.push(Issue::fixable(
                format!("source column '{col}' is bound by more than one mapping"),
                format!("remove the extra mapping for '{col}'"),
                FixAction::RemoveDuplicateMapping {
                    column: col.to_string(),
                },
            ));
        }
    }

    if config.date_mapping.date_format.is_none() {
        issues.push(Issue::unfixable(
            "date mapping has no date_format",
            "declare the date format, e.g. MM/DD/YYYY",
        ));
    }
    if config.amount_mapping.amount_format.is_none() {
        issues.push(Issue::unfixable(
            "amount mapping has no amount_format",
            "declare the amount format, e.g. USD",
        ));
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use decant_mapping::{ColumnMapping, DecoderMetadata};

    fn acme_config() -> SourceMappingConfig {
        SourceMappingConfig {
            source_id: "acme".into(),
            display_name: "Acme Bank".into(),
            description: "Acme Bank statement exports".into(),
            icon: "bank".into(),
            date_mapping: ColumnMapping::date("Date", "MM/DD/YYYY"),
            description_mapping: ColumnMapping::description_field("Description"),
            amount_mapping: ColumnMapping::amount("Amount", "USD"),
            optional_mappings: vec![ColumnMapping::optional("Memo", "memo")],
            expected_columns: vec![
                "Date".into(),
                "Description".into(),
                "Amount".into(),
                "Memo".into(),
            ],
            required_columns: vec!["Date".into(), "Description".into(), "Amount".into()],
            default_date_format: "MM/DD/YYYY".into(),
            default_amount_format: "USD".into(),
            metadata: DecoderMetadata {
                header_match: vec![
                    vec![
                        "Date".into(),
                        "Description".into(),
                        "Amount".into(),
                        "Memo".into(),
                    ],
                    vec!["Date".into(), "Description".into(), "Amount".into()],
                ],
                required_columns: vec!["Date".into(), "Description".into(), "Amount".into()],
                min_row_fields: 3,
                encoding: None,
            },
            example_data: Vec::new(),
        }
    }

    fn sample_row(date: &str, description: &str, amount: &str) -> BTreeMap<String, String> {
        let mut row = BTreeMap::new();
        row.insert("Date".to_string(), date.to_string());
        row.insert("Description".to_string(), description.to_string());
        row.insert("Amount".to_string(), amount.to_string());
        row
    }

    #[test]
    fn clean_config_with_good_samples_is_valid() {
        let mut config = acme_config();
        config.example_data = vec![
            sample_row("01/15/2024", "COFFEE SHOP", "-4.50"),
            sample_row("01/16/2024", "PAYROLL", "2,500.00"),
        ];
        let result = ValidationEngine::new().validate_config(&config);
        assert!(result.valid, "errors: {:?}", result.errors);
        assert_eq!(result.test_results.rows_processed, 2);
        assert_eq!(result.test_results.successful_conversions, 2);
        assert_eq!(result.test_results.column_tests["date"].success_rate, 1.0);
        assert_eq!(result.test_results.column_tests["amount"].success_rate, 1.0);
    }

    #[test]
    fn structural_failure_stops_before_sample_tests() {
        let mut config = acme_config();
        config
            .optional_mappings
            .push(ColumnMapping::optional("Amount", "amount_copy"));
        config.example_data = vec![sample_row("01/15/2024", "COFFEE", "-4.50")];

        let result = ValidationEngine::new().validate_config(&config);
        assert!(!result.valid);
        assert_eq!(result.test_results.rows_processed, 0);
        assert!(result.issues.iter().any(|i| matches!(
            i,
            Issue::Fixable {
                action: FixAction::RemoveDuplicateMapping { column },
                ..
            } if column == "Amount"
        )));
    }

    #[test]
    fn unexpected_mapped_column_yields_add_columns_fix() {
        let mut config = acme_config();
        config.date_mapping.source_column = "Posting Date".into();

        let result = ValidationEngine::new().validate_config(&config);
        assert!(!result.valid);
        assert!(result.issues.iter().any(|i| matches!(
            i,
            Issue::Fixable {
                action: FixAction::AddExpectedColumns { columns },
                ..
            } if columns == &["Posting Date".to_string()]
        )));
    }

    #[test]
    fn bad_sample_dates_warn_but_stay_valid() {
        let mut config = acme_config();
        config.example_data = vec![
            sample_row("01/15/2024", "OK", "1.00"),
            sample_row("13/45/2024", "BAD MONTH", "1.00"),
            sample_row("not a date", "BAD SHAPE", "1.00"),
        ];
        let result = ValidationEngine::new().validate_config(&config);
        assert!(result.valid);
        assert_eq!(result.test_results.column_tests["date"].failure, 2);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("'Date' (date)")));
    }

    #[test]
    fn implausible_year_counts_as_failure() {
        let mut config = acme_config();
        config.example_data = vec![sample_row("01/15/0209", "TYPO YEAR", "1.00")];
        let result = ValidationEngine::new().validate_config(&config);
        assert_eq!(result.test_results.column_tests["date"].failure, 1);
    }

    #[test]
    fn unknown_date_format_is_an_error() {
        let mut config = acme_config();
        config.date_mapping.date_format = Some("YYYYMMDD".into());
        let result = ValidationEngine::new().validate_config(&config);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("YYYYMMDD")));
    }

    #[test]
    fn unknown_amount_format_warns_and_falls_back() {
        let mut config = acme_config();
        config.amount_mapping.amount_format = Some("AUD".into());
        config.example_data = vec![sample_row("01/15/2024", "OK", "$5.00")];
        let result = ValidationEngine::new().validate_config(&config);
        assert!(result.valid);
        assert!(result.warnings.iter().any(|w| w.contains("AUD")));
        assert_eq!(result.test_results.column_tests["amount"].success, 1);
    }

    #[test]
    fn file_with_preamble_validates_and_reports_decoder_diagnostics() {
        let config = acme_config();
        let bytes = b"Acme Bank Export\n\
                      Account:,12345\n\
                      Date,Description,Amount,Memo\n\
                      01/15/2024,COFFEE SHOP,-4.50,card\n\
                      01/16/2024,PAYROLL,\"2,500.00\",\n";

        let result = ValidationEngine::new().validate_file(&config, bytes);
        assert!(result.valid, "errors: {:?}", result.errors);
        let robust = result.robust_parsing.expect("decode ran");
        assert_eq!(robust.header_row_index, 2);
        assert_eq!(robust.rows_decoded, 2);
        assert_eq!(robust.encoding_detected, "utf-8");
        assert_eq!(result.test_results.rows_processed, 2);
    }

    #[test]
    fn missing_required_column_in_file_is_invalid() {
        let mut config = acme_config();
        config.metadata.header_match.clear();
        let bytes = b"Date,Description\n01/15/2024,COFFEE\n";

        let result = ValidationEngine::new().validate_file(&config, bytes);
        assert!(!result.valid);
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains("'Amount'") && e.contains("not found")));
        assert!(result.issues.iter().any(|i| !i.is_fixable()));
    }

    #[test]
    fn absent_optional_column_is_a_warning_not_an_error() {
        let config = acme_config();
        let bytes = b"Date,Description,Amount\n01/15/2024,COFFEE,-4.50\n";

        let result = ValidationEngine::new().validate_file(&config, bytes);
        assert!(result.valid, "errors: {:?}", result.errors);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("optional column 'Memo'")));
    }

    #[test]
    fn low_confidence_encoding_suggests_pinning() {
        let config = acme_config();
        let bytes = b"Date,Description,Amount,Memo\n\
                      01/15/2024,CAF\xC9,-4.50,\n\
                      01/16/2024,NA\xCFVE LUNCH,-2.00,\n";

        let result = ValidationEngine::new().validate_file(&config, bytes);
        assert!(result.valid, "errors: {:?}", result.errors);
        assert!(result.issues.iter().any(|i| matches!(
            i,
            Issue::Fixable {
                action: FixAction::PinEncoding { encoding },
                ..
            } if encoding == "latin-1"
        )));
    }

    #[test]
    fn malformed_file_rows_surface_as_warnings() {
        let config = acme_config();
        let bytes = b"Date,Description,Amount\n\
                      01/15/2024,COFFEE,-4.50\n\
                      01/16/2024,LUNCH,-8.00\n\
                      garbage\n";

        let result = ValidationEngine::new().validate_file(&config, bytes);
        assert!(result.valid, "errors: {:?}", result.errors);
        assert!(result.warnings.iter().any(|w| w.contains("malformed")));
        assert_eq!(result.robust_parsing.unwrap().malformed_rows_filtered, 1);
    }
}
