mod config;
mod storage;
mod writer;

pub use config::Config;
pub use storage::{S3Config, StorageConfig};
pub use writer::{MAX_ROWS_PER_SEGMENT, WriterConfig};
