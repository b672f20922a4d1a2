//! Filesystem abstraction used by the tablet writer.
//!
//! Locations are URL-like strings. Every backend is an [`ObjectStore`]:
//! `memory://` resolves to a process-local in-memory store, `s3://<bucket>`
//! to Amazon S3 (or a compatible endpoint), and `file://` prefixes or bare
//! paths to the local disk.
//!
//! [`ObjectStore`]: object_store::ObjectStore

mod object;
mod store;

pub use object::ObjectFileSystem;
pub use store::{create_local_store, create_memory_store, create_s3_store};

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::conf::{S3Config, StorageConfig};
use crate::core::LakeError;

pub const LOCAL_SCHEME: &str = "file://";
pub const MEMORY_SCHEME: &str = "memory://";
pub const S3_SCHEME: &str = "s3://";

/// Append-only output stream for a single file.
#[async_trait]
pub trait WritableFile: Send {
    async fn append(&mut self, data: &[u8]) -> Result<(), LakeError>;

    /// Upload buffered data and publish the file. No appends are accepted
    /// afterwards. A stream dropped without `close` publishes nothing.
    async fn close(&mut self) -> Result<(), LakeError>;

    /// Total bytes appended so far.
    fn size(&self) -> u64;

    fn path(&self) -> &str;
}

#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Open a new file for appending. Failures are reported as
    /// `StreamCreationError`.
    async fn new_writable_file(&self, path: &str) -> Result<Box<dyn WritableFile>, LakeError>;

    /// Remove a file. Removing a file that does not exist succeeds.
    async fn delete_file(&self, path: &str) -> Result<(), LakeError>;

    async fn read_file(&self, path: &str) -> Result<Bytes, LakeError>;
}

/// Resolve the filesystem backing `location`, with S3 settings taken from
/// the environment and defaults.
///
/// Each `memory://` call yields a fresh, empty store.
pub fn create_from_location(location: &str) -> Result<Arc<dyn FileSystem>, LakeError> {
    Ok(Arc::new(resolve(location, &S3Config::default())?))
}

/// Resolve the filesystem backing the configured storage root.
pub fn create_from_config(config: &StorageConfig) -> Result<Arc<dyn FileSystem>, LakeError> {
    Ok(Arc::new(resolve(&config.root, &config.s3)?))
}

fn resolve(location: &str, s3: &S3Config) -> Result<ObjectFileSystem, LakeError> {
    if location.is_empty() {
        return Err(LakeError::PathResolutionError(
            "empty location".to_string(),
        ));
    }
    if location.starts_with(MEMORY_SCHEME) {
        return Ok(ObjectFileSystem::in_memory());
    }
    if let Some(rest) = location.strip_prefix(S3_SCHEME) {
        let bucket = rest.split('/').next().unwrap_or_default();
        return ObjectFileSystem::s3(bucket, s3);
    }
    if location.starts_with(LOCAL_SCHEME) || !location.contains("://") {
        return Ok(ObjectFileSystem::local());
    }
    Err(LakeError::PathResolutionError(format!(
        "unsupported scheme in location '{location}'"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("file:///tmp/lake")]
    #[case("/tmp/lake")]
    #[case("relative/dir")]
    #[case("memory://")]
    #[case("memory://tablets")]
    #[case("s3://bucket/prefix")]
    #[case("s3://bucket")]
    fn test_supported_locations(#[case] location: &str) {
        assert!(create_from_location(location).is_ok());
    }

    #[rstest]
    #[case("hdfs://namenode/path")]
    #[case("s3://")]
    #[case("s3:///no-bucket")]
    #[case("")]
    fn test_unsupported_locations(#[case] location: &str) {
        let err = create_from_location(location).err().unwrap();
        assert!(matches!(err, LakeError::PathResolutionError(_)));
    }

    #[test]
    fn test_create_from_config_with_endpoint() {
        let config = StorageConfig {
            root: "s3://lake/tablets".to_string(),
            s3: S3Config {
                region: "eu-west-1".to_string(),
                endpoint: Some("http://localhost:9000".to_string()),
            },
        };
        assert!(create_from_config(&config).is_ok());
    }
}
