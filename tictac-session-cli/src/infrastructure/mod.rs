pub mod error;
pub mod observability;
pub mod schema_export;

pub use error::{CliError, Result};
pub use observability::LogConfig;
pub use schema_export::export_schemas;
