use std::collections::BTreeMap;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::metadata::DecoderMetadata;

/// What a mapped column becomes in the normalized output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingType {
    Date,
    Description,
    Amount,
    Optional,
}

/// One declarative binding from a source column to a normalized field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub source_column: String,
    pub target_field: String,
    pub mapping_type: MappingType,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

impl ColumnMapping {
    pub fn date(source_column: impl Into<String>, date_format: impl Into<String>) -> Self {
        ColumnMapping {
            source_column: source_column.into(),
            target_field: "date".into(),
            mapping_type: MappingType::Date,
            required: true,
            date_format: Some(date_format.into()),
            amount_format: None,
            description: None,
        }
    }

    pub fn description_field(source_column: impl Into<String>) -> Self {
        ColumnMapping {
            source_column: source_column.into(),
            target_field: "description".into(),
            mapping_type: MappingType::Description,
            required: true,
            date_format: None,
            amount_format: None,
            description: None,
        }
    }

    pub fn amount(source_column: impl Into<String>, amount_format: impl Into<String>) -> Self {
        ColumnMapping {
            source_column: source_column.into(),
            target_field: "amount".into(),
            mapping_type: MappingType::Amount,
            required: true,
            date_format: None,
            amount_format: Some(amount_format.into()),
            description: None,
        }
    }

    pub fn optional(
        source_column: impl Into<String>,
        target_field: impl Into<String>,
    ) -> Self {
        ColumnMapping {
            source_column: source_column.into(),
            target_field: target_field.into(),
            mapping_type: MappingType::Optional,
            required: false,
            date_format: None,
            amount_format: None,
            description: None,
        }
    }
}

/// Complete mapping configuration for one source. This struct is the durable
/// JSON contract persisted as `config/{source_id}.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMappingConfig {
    pub source_id: String,
    pub display_name: String,
    pub description: String,
    #[serde(default = "default_icon")]
    pub icon: String,

    pub date_mapping: ColumnMapping,
    pub description_mapping: ColumnMapping,
    pub amount_mapping: ColumnMapping,
    #[serde(default)]
    pub optional_mappings: Vec<ColumnMapping>,

    pub expected_columns: Vec<String>,
    pub required_columns: Vec<String>,

    /// UI prefill for newly added mappings. Never consulted at parse time:
    /// a date mapping must carry its own `date_format` (and an amount
    /// mapping its `amount_format`) or Level 1 validation rejects the
    /// config outright.
    #[serde(default = "default_date_format")]
    pub default_date_format: String,
    #[serde(default = "default_amount_format")]
    pub default_amount_format: String,

    #[serde(default)]
    pub metadata: DecoderMetadata,

    /// Sample rows shown by the configuration UI; also used as validation
    /// sample data when no file is at hand.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub example_data: Vec<BTreeMap<String, String>>,
}

fn default_icon() -> String {
    "file".into()
}

fn default_date_format() -> String {
    "MM/DD/YYYY".into()
}

fn default_amount_format() -> String {
    "USD".into()
}

impl SourceMappingConfig {
    /// The three core mappings followed by the optional ones, in declaration
    /// order.
    pub fn all_mappings(&self) -> impl Iterator<Item = &ColumnMapping> {
        [
            &self.date_mapping,
            &self.description_mapping,
            &self.amount_mapping,
        ]
        .into_iter()
        .chain(self.optional_mappings.iter())
    }

    /// Level 1 validation: checks that need no sample data and always run
    /// first. Returns `(valid, errors)`.
    pub fn is_structurally_valid(&self) -> (bool, Vec<String>) {
        let mut errors = Vec::new();

        for (label, mapping) in [
            ("date", &self.date_mapping),
            ("description", &self.description_mapping),
            ("amount", &self.amount_mapping),
        ] {
            if mapping.source_column.trim().is_empty() {
                errors.push(format!("{label} mapping has no source column"));
            }
        }

        if self.date_mapping.date_format.is_none() {
            errors.push("date mapping must declare a date_format".into());
        }
        if self.amount_mapping.amount_format.is_none() {
            errors.push("amount mapping must declare an amount_format".into());
        }

        // No two mappings may bind the same source column.
        let mut seen = HashSet::new();
        for mapping in self.all_mappings() {
            if !mapping.source_column.trim().is_empty()
                && !seen.insert(mapping.source_column.as_str())
            {
                errors.push(format!(
                    "duplicate source column binding: '{}'",
                    mapping.source_column
                ));
            }
        }

        let expected: HashSet<&str> = self.expected_columns.iter().map(String::as_str).collect();
        for mapping in self.all_mappings() {
            let col = mapping.source_column.as_str();
            if !col.trim().is_empty() && !expected.contains(col) {
                errors.push(format!(
                    "mapped column '{col}' is not listed in expected_columns"
                ));
            }
        }

        for col in &self.required_columns {
            if !expected.contains(col.as_str()) {
                errors.push(format!(
                    "required column '{col}' is not listed in expected_columns"
                ));
            }
        }

        (errors.is_empty(), errors)
    }

    /// Non-blocking structural quality signals. A `min_row_fields` below the
    /// required column count silently admits rows missing required data.
    pub fn structural_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.metadata.min_row_fields < self.metadata.required_columns.len() {
            warnings.push(format!(
                "metadata.min_row_fields ({}) is below the required column count ({}); \
                 rows missing required fields may pass the decoder",
                self.metadata.min_row_fields,
                self.metadata.required_columns.len()
            ));
        }
        warnings
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn chase_config() -> SourceMappingConfig {
        SourceMappingConfig {
            source_id: "chase".into(),
            display_name: "Chase".into(),
            description: "Chase bank statement exports".into(),
            icon: "credit-card".into(),
            date_mapping: ColumnMapping::date("Posting Date", "MM/DD/YYYY"),
            description_mapping: ColumnMapping::description_field("Description"),
            amount_mapping: ColumnMapping::amount("Amount", "USD"),
            optional_mappings: vec![
                ColumnMapping::optional("Type", "type"),
                ColumnMapping::optional("Check or Slip #", "check_number"),
            ],
            expected_columns: vec![
                "Details".into(),
                "Posting Date".into(),
                "Description".into(),
                "Amount".into(),
                "Type".into(),
                "Balance".into(),
                "Check or Slip #".into(),
            ],
            required_columns: vec![
                "Posting Date".into(),
                "Description".into(),
                "Amount".into(),
            ],
            default_date_format: "MM/DD/YYYY".into(),
            default_amount_format: "USD".into(),
            metadata: DecoderMetadata {
                header_match: vec![vec![
                    "Details".into(),
                    "Posting Date".into(),
                    "Description".into(),
                    "Amount".into(),
                    "Type".into(),
                    "Balance".into(),
                    "Check or Slip #".into(),
                ]],
                required_columns: vec![
                    "Posting Date".into(),
                    "Description".into(),
                    "Amount".into(),
                ],
                min_row_fields: 4,
                encoding: None,
            },
            example_data: Vec::new(),
        }
    }

    #[test]
    fn valid_config_passes() {
        let (valid, errors) = chase_config().is_structurally_valid();
        assert!(valid, "errors: {errors:?}");
    }

    #[test]
    fn duplicate_source_column_fails() {
        let mut config = chase_config();
        config
            .optional_mappings
            .push(ColumnMapping::optional("Amount", "amount_copy"));
        let (valid, errors) = config.is_structurally_valid();
        assert!(!valid);
        assert!(errors.iter().any(|e| e.contains("duplicate")));
    }

    #[test]
    fn mapped_column_outside_expected_fails() {
        let mut config = chase_config();
        config.date_mapping.source_column = "Transaction Date".into();
        let (valid, errors) = config.is_structurally_valid();
        assert!(!valid);
        assert!(errors.iter().any(|e| e.contains("Transaction Date")));
    }

    #[test]
    fn required_not_subset_of_expected_fails() {
        let mut config = chase_config();
        config.required_columns.push("Memo".into());
        let (valid, errors) = config.is_structurally_valid();
        assert!(!valid);
        assert!(errors.iter().any(|e| e.contains("Memo")));
    }

    #[test]
    fn missing_date_format_fails() {
        let mut config = chase_config();
        config.date_mapping.date_format = None;
        let (valid, errors) = config.is_structurally_valid();
        assert!(!valid);
        assert!(errors.iter().any(|e| e.contains("date_format")));
    }

    #[test]
    fn empty_source_column_fails() {
        let mut config = chase_config();
        config.amount_mapping.source_column = "".into();
        let (valid, errors) = config.is_structurally_valid();
        assert!(!valid);
        assert!(errors.iter().any(|e| e.contains("amount mapping")));
    }

    #[test]
    fn low_min_row_fields_warns() {
        let mut config = chase_config();
        config.metadata.min_row_fields = 1;
        assert!(!config.structural_warnings().is_empty());
        // Structural validity is unaffected.
        assert!(config.is_structurally_valid().0);
    }

    #[test]
    fn json_round_trip() {
        let config = chase_config();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let back: SourceMappingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn required_defaults_to_true() {
        let json = r#"{
            "source_column": "Date",
            "target_field": "date",
            "mapping_type": "date",
            "date_format": "MM/DD/YYYY"
        }"#;
        let mapping: ColumnMapping = serde_json::from_str(json).unwrap();
        assert!(mapping.required);
    }
}
