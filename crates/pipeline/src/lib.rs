pub mod aggregate;
pub mod batch;
pub mod transform;

pub use aggregate::{group_by_month, write_month_csv, EmitError, EmitOptions, MonthKey};
pub use batch::{process_batch, BatchError, FileOutcome};
pub use transform::{transform, RowError, TransformError, TransformOutcome};
