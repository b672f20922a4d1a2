use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::path::Path;
use object_store::{ObjectStore, WriteMultipart};

use crate::conf::S3Config;
use crate::core::LakeError;

use super::store::{create_local_store, create_memory_store, create_s3_store};
use super::{FileSystem, LOCAL_SCHEME, MEMORY_SCHEME, S3_SCHEME, WritableFile};

/// Parts in flight per open file before `append` waits.
const MAX_CONCURRENT_PARTS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Backend {
    Memory,
    Local,
    S3 { bucket: String },
}

/// [`FileSystem`] over an [`ObjectStore`]. Clones share the same store.
///
/// Files are written as multipart uploads and become visible only once
/// their stream is closed.
#[derive(Debug, Clone)]
pub struct ObjectFileSystem {
    store: Arc<dyn ObjectStore>,
    backend: Backend,
}

impl ObjectFileSystem {
    pub fn in_memory() -> Self {
        Self {
            store: create_memory_store(),
            backend: Backend::Memory,
        }
    }

    /// Local disk. Accepts `file://` locations and bare paths; relative
    /// paths resolve against the working directory.
    pub fn local() -> Self {
        Self {
            store: create_local_store(),
            backend: Backend::Local,
        }
    }

    pub fn s3(bucket: &str, config: &S3Config) -> Result<Self, LakeError> {
        Ok(Self {
            store: create_s3_store(bucket, config)?,
            backend: Backend::S3 {
                bucket: bucket.to_string(),
            },
        })
    }

    pub async fn exists(&self, location: &str) -> Result<bool, LakeError> {
        let path = self.object_path(location)?;
        match self.store.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Sorted locations of the files directly under `dir`.
    pub async fn list(&self, dir: &str) -> Result<Vec<String>, LakeError> {
        let prefix = self.object_path(dir)?;
        let listing = self.store.list_with_delimiter(Some(&prefix)).await?;
        let mut files: Vec<String> = listing
            .objects
            .iter()
            .map(|meta| self.location_of(&meta.location))
            .collect();
        files.sort();
        Ok(files)
    }

    fn object_path(&self, location: &str) -> Result<Path, LakeError> {
        let foreign = || {
            LakeError::PathResolutionError(format!(
                "location '{location}' is outside this filesystem"
            ))
        };
        let path = match &self.backend {
            Backend::Memory => Path::parse(location.strip_prefix(MEMORY_SCHEME).ok_or_else(foreign)?),
            Backend::S3 { bucket } => {
                let key = location
                    .strip_prefix(S3_SCHEME)
                    .and_then(|rest| rest.strip_prefix(bucket.as_str()))
                    .and_then(|rest| rest.strip_prefix('/'))
                    .ok_or_else(foreign)?;
                Path::parse(key)
            }
            Backend::Local => {
                let local = location.strip_prefix(LOCAL_SCHEME).unwrap_or(location);
                let absolute = std::path::absolute(local).map_err(|e| {
                    LakeError::PathResolutionError(format!("{location}: {e}"))
                })?;
                Path::from_absolute_path(absolute)
            }
        };
        path.map_err(|e| LakeError::PathResolutionError(format!("{location}: {e}")))
    }

    fn location_of(&self, path: &Path) -> String {
        match &self.backend {
            Backend::Memory => format!("{MEMORY_SCHEME}{path}"),
            Backend::Local => format!("{LOCAL_SCHEME}/{path}"),
            Backend::S3 { bucket } => format!("{S3_SCHEME}{bucket}/{path}"),
        }
    }
}

#[async_trait]
impl FileSystem for ObjectFileSystem {
    async fn new_writable_file(&self, path: &str) -> Result<Box<dyn WritableFile>, LakeError> {
        let location = self
            .object_path(path)
            .map_err(|e| LakeError::StreamCreationError(e.to_string()))?;
        if location.as_ref().is_empty() {
            return Err(LakeError::StreamCreationError(format!(
                "invalid file path '{path}'"
            )));
        }
        let upload = self.store.put_multipart(&location).await.map_err(|e| {
            LakeError::StreamCreationError(format!("creating {path}: {e}"))
        })?;
        Ok(Box::new(ObjectWritableFile {
            path: path.to_string(),
            upload: Some(WriteMultipart::new(upload)),
            size: 0,
        }))
    }

    async fn delete_file(&self, path: &str) -> Result<(), LakeError> {
        let location = self.object_path(path)?;
        match self.store.delete(&location).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(LakeError::IoError(format!("deleting {path}: {e}"))),
        }
    }

    async fn read_file(&self, path: &str) -> Result<Bytes, LakeError> {
        let location = self.object_path(path)?;
        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| LakeError::IoError(format!("reading {path}: {e}")))?;
        Ok(result.bytes().await?)
    }
}

struct ObjectWritableFile {
    path: String,
    upload: Option<WriteMultipart>,
    size: u64,
}

impl ObjectWritableFile {
    fn open_upload(&mut self) -> Result<&mut WriteMultipart, LakeError> {
        let path = &self.path;
        self.upload
            .as_mut()
            .ok_or_else(|| LakeError::IoError(format!("{path} is already closed")))
    }
}

#[async_trait]
impl WritableFile for ObjectWritableFile {
    async fn append(&mut self, data: &[u8]) -> Result<(), LakeError> {
        let upload = self.open_upload()?;
        upload.wait_for_capacity(MAX_CONCURRENT_PARTS).await?;
        upload.write(data);
        self.size += data.len() as u64;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), LakeError> {
        let upload = self
            .upload
            .take()
            .ok_or_else(|| LakeError::IoError(format!("{} is already closed", self.path)))?;
        upload
            .finish()
            .await
            .map_err(|e| LakeError::IoError(format!("closing {}: {e}", self.path)))?;
        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn path(&self) -> &str {
        &self.path
    }
}
