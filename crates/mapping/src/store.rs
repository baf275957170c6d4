use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SourceMappingConfig;
use crate::metadata::DecoderMetadata;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no mapping configuration for source '{0}'")]
    NotFound(String),
    #[error("mapping for '{source_id}' is structurally invalid: {}", errors.join("; "))]
    InvalidConfig {
        source_id: String,
        errors: Vec<String>,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Explicit configuration-store seam. Pipeline and validation components
/// take one of these instead of reaching into ambient global state, so they
/// stay pure and testable against an in-memory or temp-dir store.
pub trait MappingStore {
    fn load(&self, source_id: &str) -> Result<SourceMappingConfig, StoreError>;
    fn save(&self, config: &SourceMappingConfig) -> Result<(), StoreError>;
    fn delete(&self, source_id: &str) -> Result<(), StoreError>;
    fn list(&self) -> Result<Vec<String>, StoreError>;
}

/// Durable contents of `data/source_metadata/{source_id}/metadata.json`:
/// the decoder metadata plus sample rows cached for UI auto-loading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadataFile {
    pub metadata: DecoderMetadata,
    #[serde(default)]
    pub sample_rows: Vec<BTreeMap<String, String>>,
}

/// One JSON document per source under `{root}/config/`, metadata cache under
/// `{root}/data/source_metadata/`. Writes are last-writer-wins per source.
pub struct JsonMappingStore {
    root: PathBuf,
}

impl JsonMappingStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        JsonMappingStore { root: root.into() }
    }

    /// Convenience for callers holding a base directory path.
    pub fn at(root: &Path) -> Self {
        JsonMappingStore::new(root.to_path_buf())
    }

    fn config_dir(&self) -> PathBuf {
        self.root.join("config")
    }

    fn config_path(&self, source_id: &str) -> PathBuf {
        self.config_dir()
            .join(format!("{}.json", source_id.to_lowercase()))
    }

    fn metadata_dir(&self, source_id: &str) -> PathBuf {
        self.root
            .join("data")
            .join("source_metadata")
            .join(source_id.to_lowercase())
    }

    fn metadata_path(&self, source_id: &str) -> PathBuf {
        self.metadata_dir(source_id).join("metadata.json")
    }

    /// Write the metadata cache file for a source.
    pub fn save_metadata(
        &self,
        source_id: &str,
        file: &SourceMetadataFile,
    ) -> Result<(), StoreError> {
        let dir = self.metadata_dir(source_id);
        fs::create_dir_all(&dir)?;
        let json = serde_json::to_string_pretty(file)?;
        fs::write(self.metadata_path(source_id), json)?;
        Ok(())
    }

    /// Read the metadata cache file for a source, if present.
    pub fn load_metadata(&self, source_id: &str) -> Result<Option<SourceMetadataFile>, StoreError> {
        let path = self.metadata_path(source_id);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Load every stored configuration, skipping files that fail to parse
    /// (with a warning) rather than aborting the whole load.
    pub fn load_all(&self) -> Result<Vec<SourceMappingConfig>, StoreError> {
        let mut configs = Vec::new();
        for source_id in self.list()? {
            match self.load(&source_id) {
                Ok(config) => configs.push(config),
                Err(e) => {
                    tracing::warn!("skipping mapping for '{source_id}': {e}");
                }
            }
        }
        Ok(configs)
    }
}

impl MappingStore for JsonMappingStore {
    fn load(&self, source_id: &str) -> Result<SourceMappingConfig, StoreError> {
        let path = self.config_path(source_id);
        if !path.exists() {
            return Err(StoreError::NotFound(source_id.to_string()));
        }
        let text = fs::read_to_string(&path)?;
        let config: SourceMappingConfig = serde_json::from_str(&text)?;
        tracing::debug!("loaded mapping for '{}' from {}", source_id, path.display());
        Ok(config)
    }

    /// A structurally invalid mapping is never persisted: Level-1 failures
    /// block the save outright.
    fn save(&self, config: &SourceMappingConfig) -> Result<(), StoreError> {
        let (valid, errors) = config.is_structurally_valid();
        if !valid {
            return Err(StoreError::InvalidConfig {
                source_id: config.source_id.clone(),
                errors,
            });
        }

        fs::create_dir_all(self.config_dir())?;
        let json = serde_json::to_string_pretty(config)?;
        fs::write(self.config_path(&config.source_id), json)?;

        self.save_metadata(
            &config.source_id,
            &SourceMetadataFile {
                metadata: config.metadata.clone(),
                sample_rows: config.example_data.clone(),
            },
        )?;

        tracing::info!("saved mapping for '{}'", config.source_id);
        Ok(())
    }

    fn delete(&self, source_id: &str) -> Result<(), StoreError> {
        let path = self.config_path(source_id);
        if !path.exists() {
            return Err(StoreError::NotFound(source_id.to_string()));
        }
        fs::remove_file(path)?;

        let meta_dir = self.metadata_dir(source_id);
        if meta_dir.exists() {
            fs::remove_dir_all(meta_dir)?;
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.config_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}
