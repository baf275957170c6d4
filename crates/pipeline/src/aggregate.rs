use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use thiserror::Error;

use decant_core::NormalizedTransaction;

/// Calendar month a transaction falls in. Orders chronologically and
/// renders as `YYYY_MM`, the naming convention for per-month output files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of(date: NaiveDate) -> Self {
        MonthKey {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{:02}", self.year, self.month)
    }
}

/// One month's transactions, grouped by description.
pub type MonthGroup<'a> = BTreeMap<String, Vec<&'a NormalizedTransaction>>;

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Clone)]
pub struct EmitOptions {
    pub include_source_file: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions {
            include_source_file: true,
        }
    }
}

/// Group transactions by calendar month, then by description within each
/// month. Insertion order inside a group follows the input slice.
pub fn group_by_month(
    transactions: &[NormalizedTransaction],
) -> BTreeMap<MonthKey, MonthGroup<'_>> {
    let mut grouped: BTreeMap<MonthKey, MonthGroup<'_>> = BTreeMap::new();
    for tx in transactions {
        grouped
            .entry(MonthKey::of(tx.date))
            .or_default()
            .entry(tx.description.clone())
            .or_default()
            .push(tx);
    }
    grouped
}

/// Render one month's group as CSV text. Every row repeats its group's
/// total so the output stays flat and spreadsheet-friendly. Extra mapped
/// fields become columns after the core four; a transaction without a
/// given extra field gets an empty cell.
pub fn write_month_csv(month: &MonthGroup<'_>, options: &EmitOptions) -> Result<String, EmitError> {
    let extra_fields: BTreeSet<&str> = month
        .values()
        .flatten()
        .flat_map(|tx| tx.extra.keys().map(String::as_str))
        .collect();

    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["Date", "Description", "Amount", "Group Total"];
    header.extend(extra_fields.iter().copied());
    if options.include_source_file {
        header.push("Source File");
    }
    writer.write_record(&header)?;

    for (description, transactions) in month {
        let group_total: Decimal = transactions.iter().map(|tx| tx.amount).sum();
        for tx in transactions {
            let mut record = vec![
                tx.date_iso(),
                description.clone(),
                tx.amount.to_string(),
                group_total.to_string(),
            ];
            for field in &extra_fields {
                record.push(tx.extra.get(*field).cloned().unwrap_or_default());
            }
            if options.include_source_file {
                record.push(tx.source_file.clone());
            }
            writer.write_record(&record)?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| EmitError::Io(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn tx(date: &str, description: &str, amount: &str) -> NormalizedTransaction {
        NormalizedTransaction::new(
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            description,
            Decimal::from_str(amount).unwrap(),
            "statement.csv",
        )
    }

    #[test]
    fn groups_span_months_and_descriptions() {
        let transactions = vec![
            tx("2024-01-15", "COFFEE SHOP", "-4.50"),
            tx("2024-01-20", "COFFEE SHOP", "-5.25"),
            tx("2024-01-31", "PAYROLL", "2500.00"),
            tx("2024-02-01", "RENT", "-1800.00"),
        ];

        let grouped = group_by_month(&transactions);
        assert_eq!(grouped.len(), 2);

        let january = &grouped[&MonthKey { year: 2024, month: 1 }];
        assert_eq!(january["COFFEE SHOP"].len(), 2);
        assert_eq!(january["PAYROLL"].len(), 1);
    }

    #[test]
    fn month_key_renders_zero_padded() {
        let key = MonthKey::of(NaiveDate::from_ymd_opt(2024, 3, 7).unwrap());
        assert_eq!(key.to_string(), "2024_03");
    }

    #[test]
    fn csv_repeats_group_totals() {
        let transactions = vec![
            tx("2024-01-15", "COFFEE SHOP", "-4.50"),
            tx("2024-01-20", "COFFEE SHOP", "-5.25"),
        ];
        let grouped = group_by_month(&transactions);
        let month = &grouped[&MonthKey { year: 2024, month: 1 }];

        let csv = write_month_csv(month, &EmitOptions::default()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Date,Description,Amount,Group Total,Source File"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2024-01-15,COFFEE SHOP,-4.50,-9.75,statement.csv"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2024-01-20,COFFEE SHOP,-5.25,-9.75,statement.csv"
        );
    }

    #[test]
    fn extra_fields_become_columns() {
        let mut with_memo = tx("2024-01-15", "CHECK 1042", "-100.00");
        with_memo.extra.insert("check_number".into(), "1042".into());
        let without = tx("2024-01-16", "ATM WITHDRAWAL", "-60.00");

        let transactions = vec![with_memo, without];
        let grouped = group_by_month(&transactions);
        let month = &grouped[&MonthKey { year: 2024, month: 1 }];

        let options = EmitOptions {
            include_source_file: false,
        };
        let csv = write_month_csv(month, &options).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Date,Description,Amount,Group Total,check_number"
        );
        // BTreeMap ordering puts ATM WITHDRAWAL before CHECK 1042.
        assert_eq!(lines.next().unwrap(), "2024-01-16,ATM WITHDRAWAL,-60.00,-60.00,");
        assert_eq!(lines.next().unwrap(), "2024-01-15,CHECK 1042,-100.00,-100.00,1042");
    }
}
