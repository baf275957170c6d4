pub mod engine;
pub mod report;

pub use engine::ValidationEngine;
pub use report::{ColumnTest, RobustParsing, TestResults, ValidationResult};
