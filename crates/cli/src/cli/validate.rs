use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use decant_decode::decode;
use decant_mapping::{DecoderMetadata, JsonMappingStore, MappingStore};
use decant_validate::{RobustParsing, ValidationEngine, ValidationResult};

pub fn run(
    file: &Path,
    source: Option<&str>,
    metadata: Option<&str>,
    config_dir: &Path,
    output: Option<&Path>,
) -> Result<i32> {
    let bytes = fs::read(file).with_context(|| format!("reading {}", file.display()))?;

    let result = match (source, metadata) {
        (Some(source_id), _) => {
            let store = JsonMappingStore::at(config_dir);
            let config = store
                .load(source_id)
                .with_context(|| format!("loading mapping for '{source_id}'"))?;
            ValidationEngine::new().validate_file(&config, &bytes)
        }
        (None, Some(json)) => {
            let metadata: DecoderMetadata =
                serde_json::from_str(json).context("parsing --metadata JSON")?;
            decode_only(&bytes, &metadata)
        }
        (None, None) => bail!("either --source or --metadata is required"),
    };

    let json = serde_json::to_string_pretty(&result)?;
    match output {
        Some(path) => {
            fs::write(path, &json).with_context(|| format!("writing {}", path.display()))?
        }
        None => println!("{json}"),
    }

    Ok(if result.valid { 0 } else { 1 })
}

/// Without a full mapping there is nothing to validate beyond the decode
/// itself: surface its diagnostics in the same result shape.
fn decode_only(bytes: &[u8], metadata: &DecoderMetadata) -> ValidationResult {
    let mut result = ValidationResult::default();
    match decode(bytes, metadata) {
        Ok(table) => {
            if table.malformed_rows_filtered > 0 {
                result.warnings.push(format!(
                    "{} malformed rows were filtered out while decoding the file",
                    table.malformed_rows_filtered
                ));
            }
            if table.confidence < 0.8 {
                result.warnings.push(format!(
                    "encoding detected as {} with low confidence ({:.2})",
                    table.encoding_detected, table.confidence
                ));
            }
            result.test_results.rows_processed = table.rows.len();
            result.robust_parsing = Some(RobustParsing::from(&table));
            result.valid = true;
        }
        Err(e) => {
            result.errors.push(format!("file decode failed: {e}"));
        }
    }
    result
}
