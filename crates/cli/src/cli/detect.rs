use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use decant_decode::decode;
use decant_mapping::{detect_source, DecoderMetadata, JsonMappingStore};

pub fn run(file: &Path, config_dir: &Path) -> Result<i32> {
    let bytes = fs::read(file).with_context(|| format!("reading {}", file.display()))?;

    // Probe with empty metadata: no header patterns means the first
    // non-empty record is taken as the header, which is all detection needs.
    let table = decode(&bytes, &DecoderMetadata::default())?;

    let store = JsonMappingStore::at(config_dir);
    let configs = store.load_all()?;
    if configs.is_empty() {
        println!("no mapping configurations stored");
        return Ok(1);
    }

    let matches = detect_source(&table.headers, &configs);
    println!("{}", serde_json::to_string_pretty(&matches)?);
    Ok(0)
}
