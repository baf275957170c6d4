use thiserror::Error;

use decant_decode::{decode, DecodeError};
use decant_mapping::SourceMappingConfig;

use crate::transform::{transform, TransformError, TransformOutcome};

/// Why one file in a batch produced no transactions.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Result of processing one file of a batch; failures stay attached to
/// their file and never abort the others.
#[derive(Debug)]
pub struct FileOutcome {
    pub file_name: String,
    pub result: Result<TransformOutcome, BatchError>,
}

/// Decode and transform each file on its own scoped worker thread. Safe to
/// fan out because each file's work is a pure function over its bytes and
/// the shared read-only config.
pub fn process_batch(
    files: &[(String, Vec<u8>)],
    config: &SourceMappingConfig,
) -> Vec<FileOutcome> {
    tracing::info!(
        "processing batch of {} files for source '{}'",
        files.len(),
        config.source_id
    );
    std::thread::scope(|scope| {
        let handles: Vec<_> = files
            .iter()
            .map(|(name, bytes)| {
                scope.spawn(move || FileOutcome {
                    file_name: name.clone(),
                    result: process_one(bytes, config, name),
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("batch worker panicked"))
            .collect()
    })
}

fn process_one(
    bytes: &[u8],
    config: &SourceMappingConfig,
    name: &str,
) -> Result<TransformOutcome, BatchError> {
    let table = decode(bytes, &config.metadata)?;
    Ok(transform(&table, config, name)?)
}
