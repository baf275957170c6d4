pub mod decoder;
pub mod encoding;

pub use decoder::{decode, DecodedTable};

use thiserror::Error;

/// Terminal failure for one file. The caller surfaces these per-file; a
/// decode failure never aborts a multi-file batch.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("could not find a header row matching any configured pattern")]
    HeaderNotFound,
    #[error("required columns missing from header: {}", columns.join(", "))]
    MissingRequiredColumns { columns: Vec<String> },
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),
    #[error("no data rows after the header")]
    NoDataRows,
    #[error("too many malformed rows: only {kept} of {total} data rows usable")]
    TooManyMalformedRows { kept: usize, total: usize },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
