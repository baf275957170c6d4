use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The institution-agnostic record every source converges to.
///
/// `amount` keeps the sign of the upstream data (negative = debit).
/// Optional mapped columns land in `extra` under their target field name;
/// a column absent from a given file simply never appears there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub source_file: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl NormalizedTransaction {
    pub fn new(
        date: NaiveDate,
        description: impl Into<String>,
        amount: Decimal,
        source_file: impl Into<String>,
    ) -> Self {
        NormalizedTransaction {
            date,
            description: description.into(),
            amount,
            source_file: source_file.into(),
            extra: BTreeMap::new(),
        }
    }

    /// ISO-8601 rendering of the transaction date, the output-side contract.
    pub fn date_iso(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}
