use std::sync::Arc;

use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;

use crate::conf::S3Config;
use crate::core::LakeError;

/// Local disk store rooted at `/`.
pub fn create_local_store() -> Arc<dyn ObjectStore> {
    Arc::new(LocalFileSystem::new())
}

pub fn create_memory_store() -> Arc<dyn ObjectStore> {
    Arc::new(InMemory::new())
}

/// S3 store for `bucket`. Credentials come from the usual `AWS_*`
/// environment variables; region and endpoint from `config`.
pub fn create_s3_store(bucket: &str, config: &S3Config) -> Result<Arc<dyn ObjectStore>, LakeError> {
    if bucket.is_empty() {
        return Err(LakeError::PathResolutionError(
            "s3 location without a bucket".to_string(),
        ));
    }
    let mut builder = AmazonS3Builder::from_env()
        .with_bucket_name(bucket)
        .with_region(&config.region);

    // MinIO, LocalStack and friends
    if let Some(endpoint) = &config.endpoint {
        builder = builder.with_endpoint(endpoint);
        if endpoint.starts_with("http://") {
            builder = builder.with_allow_http(true);
        }
    }

    let store = builder.build().map_err(|e| {
        LakeError::PathResolutionError(format!(
            "Failed to create S3 store for bucket '{bucket}': {e}"
        ))
    })?;
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_s3_store() {
        assert!(create_s3_store("bucket", &S3Config::default()).is_ok());
    }

    #[test]
    fn test_create_s3_store_requires_bucket() {
        let err = create_s3_store("", &S3Config::default()).err().unwrap();
        assert!(matches!(err, LakeError::PathResolutionError(_)));
    }
}
