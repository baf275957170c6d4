use serde::Serialize;
use thiserror::Error;

use decant_core::amount::{parse_amount, AmountFormat};
use decant_core::date::{parse_date, DateFormat};
use decant_core::NormalizedTransaction;
use decant_decode::DecodedTable;
use decant_mapping::SourceMappingConfig;

/// Configuration-level failure that prevents transforming any row at all.
/// Per-row problems are [`RowError`]s, not this.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("mapped column '{0}' not found in decoded headers")]
    MissingColumn(String),
    #[error("unknown date format '{0}'")]
    UnknownDateFormat(String),
    #[error("unknown amount format '{0}'")]
    UnknownAmountFormat(String),
}

/// One skipped row: index into the decoded table plus the parse failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    pub row_index: usize,
    pub reason: String,
}

#[derive(Debug, Default, Serialize)]
pub struct TransformOutcome {
    pub transactions: Vec<NormalizedTransaction>,
    pub row_errors: Vec<RowError>,
}

impl TransformOutcome {
    pub fn success_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn failure_count(&self) -> usize {
        self.row_errors.len()
    }
}

/// Apply a mapping to a decoded table, producing one normalized transaction
/// per convertible row. Rows that fail required-field parsing are skipped
/// and recorded; one bad row never aborts the rest.
pub fn transform(
    table: &DecodedTable,
    config: &SourceMappingConfig,
    source_filename: &str,
) -> Result<TransformOutcome, TransformError> {
    let date_name = config.date_mapping.date_format.as_deref().unwrap_or("");
    let date_format: DateFormat = date_name
        .parse()
        .map_err(|_| TransformError::UnknownDateFormat(date_name.to_string()))?;
    let amount_name = config.amount_mapping.amount_format.as_deref().unwrap_or("");
    let amount_format: AmountFormat = amount_name
        .parse()
        .map_err(|_| TransformError::UnknownAmountFormat(amount_name.to_string()))?;

    let date_idx = resolve_column(table, &config.date_mapping.source_column)?;
    let description_idx = resolve_column(table, &config.description_mapping.source_column)?;
    let amount_idx = resolve_column(table, &config.amount_mapping.source_column)?;

    // Optional columns resolve to header positions once; a column absent
    // from this file is omitted from every output record.
    let optional: Vec<(usize, &str)> = config
        .optional_mappings
        .iter()
        .filter_map(|mapping| {
            table
                .column_index(&mapping.source_column)
                .map(|idx| (idx, mapping.target_field.as_str()))
        })
        .collect();

    let mut outcome = TransformOutcome::default();
    for (row_index, row) in table.rows.iter().enumerate() {
        let converted = convert_row(
            row,
            date_idx,
            date_format,
            description_idx,
            config.description_mapping.required,
            amount_idx,
            amount_format,
            &optional,
            source_filename,
        );
        match converted {
            Ok(tx) => outcome.transactions.push(tx),
            Err(reason) => {
                tracing::warn!("skipping row {row_index} of '{source_filename}': {reason}");
                outcome.row_errors.push(RowError { row_index, reason });
            }
        }
    }

    tracing::info!(
        "transformed '{}': {} transactions, {} rows skipped",
        source_filename,
        outcome.success_count(),
        outcome.failure_count()
    );
    Ok(outcome)
}

fn resolve_column(table: &DecodedTable, column: &str) -> Result<usize, TransformError> {
    table
        .column_index(column)
        .ok_or_else(|| TransformError::MissingColumn(column.to_string()))
}

#[allow(clippy::too_many_arguments)]
fn convert_row(
    row: &[String],
    date_idx: usize,
    date_format: DateFormat,
    description_idx: usize,
    description_required: bool,
    amount_idx: usize,
    amount_format: AmountFormat,
    optional: &[(usize, &str)],
    source_filename: &str,
) -> Result<NormalizedTransaction, String> {
    let raw_date = row.get(date_idx).map(String::as_str).unwrap_or("");
    let date = parse_date(raw_date, date_format).map_err(|e| e.to_string())?;

    // The description is copied verbatim (trimmed); an empty value only
    // fails the row when the mapping declares the field required.
    let description = row
        .get(description_idx)
        .map(|s| s.trim())
        .unwrap_or_default();
    if description.is_empty() && description_required {
        return Err("empty description".into());
    }

    let raw_amount = row.get(amount_idx).map(String::as_str).unwrap_or("");
    let amount = parse_amount(raw_amount, amount_format).map_err(|e| e.to_string())?;

    let mut tx = NormalizedTransaction::new(date, description, amount, source_filename);
    for &(idx, target) in optional {
        if let Some(value) = row.get(idx) {
            if !value.is_empty() {
                tx.extra.insert(target.to_string(), value.clone());
            }
        }
    }
    Ok(tx)
}
