pub mod config;
pub mod detect;
pub mod issue;
pub mod metadata;
pub mod store;

pub use config::{ColumnMapping, MappingType, SourceMappingConfig};
pub use detect::{detect_source, SourceMatch};
pub use issue::{FixAction, Issue};
pub use metadata::DecoderMetadata;
pub use store::{JsonMappingStore, MappingStore, SourceMetadataFile, StoreError};
