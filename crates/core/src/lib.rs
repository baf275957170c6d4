pub mod amount;
pub mod date;
pub mod transaction;

pub use amount::{parse_amount, AmountFormat};
pub use date::{parse_date, DateFormat};
pub use transaction::NormalizedTransaction;

use thiserror::Error;

/// Failure to interpret a single field value under a declared format.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("invalid date '{value}' for format {format}")]
    InvalidDate { value: String, format: String },
    #[error("unknown date format: {0}")]
    UnknownDateFormat(String),
    #[error("invalid amount: '{0}'")]
    InvalidAmount(String),
    #[error("unknown amount format: {0}")]
    UnknownAmountFormat(String),
}
