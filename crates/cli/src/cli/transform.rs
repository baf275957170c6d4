use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use decant_decode::decode;
use decant_mapping::{JsonMappingStore, MappingStore};
use decant_pipeline::{group_by_month, transform, write_month_csv, EmitOptions};

pub fn run(file: &Path, source: &str, config_dir: &Path, out_dir: &Path) -> Result<i32> {
    let bytes = fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let store = JsonMappingStore::at(config_dir);
    let config = store
        .load(source)
        .with_context(|| format!("loading mapping for '{source}'"))?;

    let table = decode(&bytes, &config.metadata)?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.csv");
    let outcome = transform(&table, &config, file_name)?;

    for err in &outcome.row_errors {
        eprintln!("skipped row {}: {}", err.row_index, err.reason);
    }

    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let grouped = group_by_month(&outcome.transactions);
    let options = EmitOptions::default();
    for (month, group) in &grouped {
        let csv = write_month_csv(group, &options)?;
        let path = out_dir.join(format!("{}_{month}.csv", config.source_id));
        fs::write(&path, csv).with_context(|| format!("writing {}", path.display()))?;
        println!("wrote {}", path.display());
    }

    println!(
        "{} transactions, {} rows skipped",
        outcome.success_count(),
        outcome.failure_count()
    );
    Ok(if outcome.success_count() == 0 { 1 } else { 0 })
}
