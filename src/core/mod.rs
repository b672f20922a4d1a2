mod error;
mod logger;
mod schema;

pub use error::LakeError;
pub use logger::setup_logging;
pub use schema::{ColumnSchema, DType, TabletSchema};
