use std::path::Path;

use anyhow::Result;

use decant_mapping::JsonMappingStore;

pub fn run(config_dir: &Path) -> Result<i32> {
    let store = JsonMappingStore::at(config_dir);
    let configs = store.load_all()?;

    if configs.is_empty() {
        println!("no mapping configurations stored");
        return Ok(0);
    }

    for config in configs {
        println!(
            "{:<16} {}: {}",
            config.source_id, config.display_name, config.description
        );
    }
    Ok(0)
}
