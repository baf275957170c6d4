use serde::Serialize;

use decant_mapping::DecoderMetadata;

use crate::encoding::decode_bytes;
use crate::DecodeError;

/// Minimum fraction of data rows that must survive malformed-row filtering
/// for a decode to be considered usable at all.
const MIN_WELL_FORMED_FRACTION: f32 = 0.3;

/// The in-memory result of decoding one file: a rectangular table plus the
/// diagnostics the validation engine surfaces verbatim. Immutable once
/// returned; identical bytes and metadata always produce an identical table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub encoding_detected: String,
    pub confidence: f32,
    pub malformed_rows_filtered: usize,
    /// Index of the header among the file's parsed records; everything
    /// before it was preamble.
    pub header_row_index: usize,
}

impl DecodedTable {
    /// Position of a named column in `headers`, matching exactly first and
    /// case-insensitively second.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .or_else(|| {
                self.headers
                    .iter()
                    .position(|h| h.eq_ignore_ascii_case(name))
            })
    }

    /// Cell value at `(row, column name)`, if both exist.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }
}

/// Decode raw file bytes into a [`DecodedTable`] under the given metadata.
///
/// Pure function over `(bytes, metadata)`:
/// 1. decode text (pinned encoding, else BOM / UTF-8 / Latin-1 detection);
/// 2. locate the header row: first record matching any `header_match`
///    pattern (order-sensitive, case-insensitive per column), discarding
///    preamble records before it;
/// 3. trim trailing empty header columns, then trim trailing empty cells
///    from every data row before the width check;
/// 4. filter malformed rows: wider than the header, narrower than
///    `min_row_fields`, or with an empty value in a required column;
/// 5. fail outright if under 30% of data rows survive.
pub fn decode(bytes: &[u8], metadata: &DecoderMetadata) -> Result<DecodedTable, DecodeError> {
    let decoded = decode_bytes(bytes, metadata.encoding.as_deref())?;
    tracing::info!(
        "detected encoding: {} (confidence: {:.2})",
        decoded.encoding,
        decoded.confidence
    );

    let records = read_records(&decoded.text)?;

    let (header_row_index, headers) = locate_header(&records, &metadata.header_match)?;
    tracing::info!(
        "found header row at record {}: {:?}",
        header_row_index,
        headers
    );

    let missing: Vec<String> = metadata
        .required_columns
        .iter()
        .filter(|col| !headers.iter().any(|h| h.eq_ignore_ascii_case(col)))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(DecodeError::MissingRequiredColumns { columns: missing });
    }

    // Header positions of the required columns, for the per-row check.
    let required_indices: Vec<usize> = metadata
        .required_columns
        .iter()
        .filter_map(|col| headers.iter().position(|h| h.eq_ignore_ascii_case(col)))
        .collect();

    let mut rows = Vec::new();
    let mut malformed = 0usize;
    let mut candidates = 0usize;

    for record in records.iter().skip(header_row_index + 1) {
        let mut row = record.clone();
        trim_trailing_empty(&mut row);

        if row.iter().all(|cell| cell.is_empty()) {
            continue; // blank rows are neither data nor malformed
        }
        candidates += 1;

        // Wider than the header means alignment is ambiguous; narrower than
        // the floor means required data cannot all be present.
        if row.len() > headers.len() || row.len() < metadata.min_row_fields {
            malformed += 1;
            continue;
        }

        row.resize(headers.len(), String::new());

        if required_indices.iter().any(|&idx| row[idx].is_empty()) {
            malformed += 1;
            continue;
        }

        rows.push(row);
    }

    if malformed > 0 {
        tracing::warn!("filtered {malformed} malformed rows of {candidates}");
    }

    if candidates == 0 {
        return Err(DecodeError::NoDataRows);
    }
    let kept_fraction = rows.len() as f32 / candidates as f32;
    if kept_fraction < MIN_WELL_FORMED_FRACTION {
        return Err(DecodeError::TooManyMalformedRows {
            kept: rows.len(),
            total: candidates,
        });
    }

    Ok(DecodedTable {
        headers,
        rows,
        encoding_detected: decoded.encoding,
        confidence: decoded.confidence,
        malformed_rows_filtered: malformed,
        header_row_index,
    })
}

/// Parse every record with a flexible reader: ragged rows are preserved
/// as-is, quoted commas and all line-ending styles are handled by the csv
/// crate.
fn read_records(text: &str) -> Result<Vec<Vec<String>>, DecodeError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        records.push(record.iter().map(|cell| cell.trim().to_string()).collect());
    }
    Ok(records)
}

/// Scan records in file order for the first one matching any pattern; the
/// first matching pattern wins. With no patterns configured, the first
/// non-empty record is taken as the header (legacy single-table files).
fn locate_header(
    records: &[Vec<String>],
    patterns: &[Vec<String>],
) -> Result<(usize, Vec<String>), DecodeError> {
    if patterns.is_empty() {
        return records
            .iter()
            .position(|r| r.iter().any(|cell| !cell.is_empty()))
            .map(|idx| {
                let mut headers = records[idx].clone();
                trim_trailing_empty(&mut headers);
                (idx, headers)
            })
            .ok_or(DecodeError::HeaderNotFound);
    }

    for (idx, record) in records.iter().enumerate() {
        let mut candidate = record.clone();
        trim_trailing_empty(&mut candidate);
        if patterns.iter().any(|p| matches_pattern(&candidate, p)) {
            return Ok((idx, candidate));
        }
    }
    Err(DecodeError::HeaderNotFound)
}

/// Order-sensitive, case-insensitive comparison of a candidate header row
/// against one expected pattern.
fn matches_pattern(candidate: &[String], pattern: &[String]) -> bool {
    candidate.len() == pattern.len()
        && candidate
            .iter()
            .zip(pattern)
            .all(|(cell, expected)| cell.eq_ignore_ascii_case(expected.trim()))
}

fn trim_trailing_empty(row: &mut Vec<String>) {
    while row.last().is_some_and(|cell| cell.is_empty()) {
        row.pop();
    }
}
