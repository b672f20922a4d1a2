use std::sync::Arc;

use tokio::sync::RwLock;

use crate::core::{LakeError, TabletSchema};
use crate::writer::WriterOutput;

/// Location of a delete vector inside a delvec file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelvecPage {
    pub version: i64,
    pub offset: u64,
    pub size: u64,
}

/// Delete vector of one segment, keyed by segment ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelvecPair {
    pub segment_id: u32,
    pub page: DelvecPage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowsetMetadata {
    pub id: u32,
    pub segments: Vec<String>,
    pub num_rows: u64,
    pub data_size: u64,
    /// Segments of the rowset may have overlapping key ranges.
    pub overlapped: bool,
}

/// One immutable version of a tablet's metadata.
///
/// Never mutated after publication: a new version is derived with
/// [`next_version`](TabletMetadata::next_version) and swapped in through a
/// [`MetadataCell`].
#[derive(Debug, Clone, PartialEq)]
pub struct TabletMetadata {
    pub id: i64,
    pub version: i64,
    pub schema: Arc<TabletSchema>,
    pub rowsets: Vec<RowsetMetadata>,
    pub delvec_pairs: Vec<DelvecPair>,
    pub next_rowset_id: u32,
}

impl TabletMetadata {
    /// Version 1 of an empty tablet.
    pub fn new(id: i64, schema: TabletSchema) -> Self {
        Self {
            id,
            version: 1,
            schema: Arc::new(schema),
            rowsets: Vec::new(),
            delvec_pairs: Vec::new(),
            next_rowset_id: 0,
        }
    }

    /// Derive the next version with the writer's output appended as a new
    /// rowset. An output without files only bumps the version.
    ///
    /// A rowset reserves one id per segment; running out of ids is a
    /// `MetadataConflict`.
    pub fn next_version(&self, output: &WriterOutput) -> Result<TabletMetadata, LakeError> {
        let mut next = self.clone();
        next.version = self.version + 1;
        if !output.files.is_empty() {
            next.next_rowset_id = u32::try_from(output.files.len())
                .ok()
                .and_then(|n| self.next_rowset_id.checked_add(n))
                .ok_or_else(|| {
                    LakeError::MetadataConflict(format!(
                        "tablet {} out of rowset ids: next {}, {} segments",
                        self.id,
                        self.next_rowset_id,
                        output.files.len()
                    ))
                })?;
            next.rowsets.push(RowsetMetadata {
                id: self.next_rowset_id,
                segments: output.files.clone(),
                num_rows: output.num_rows,
                data_size: output.data_size,
                overlapped: output.files.len() > 1,
            });
        }
        Ok(next)
    }

    pub fn num_rows(&self) -> u64 {
        self.rowsets.iter().map(|r| r.num_rows).sum()
    }

    pub fn data_size(&self) -> u64 {
        self.rowsets.iter().map(|r| r.data_size).sum()
    }
}

/// Holder of the latest published metadata version of a tablet.
#[derive(Debug, Default)]
pub struct MetadataCell {
    current: RwLock<Option<Arc<TabletMetadata>>>,
}

impl MetadataCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(metadata: TabletMetadata) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(metadata))),
        }
    }

    pub async fn current(&self) -> Option<Arc<TabletMetadata>> {
        self.current.read().await.clone()
    }

    /// Publish `metadata` if it directly follows the current version (or is
    /// the first version). Readers holding the previous `Arc` are unaffected.
    pub async fn publish(&self, metadata: TabletMetadata) -> Result<Arc<TabletMetadata>, LakeError> {
        let mut current = self.current.write().await;
        if let Some(prev) = current.as_ref() {
            if prev.id != metadata.id {
                return Err(LakeError::MetadataConflict(format!(
                    "tablet id {} does not match {}",
                    metadata.id, prev.id
                )));
            }
            if metadata.version != prev.version + 1 {
                return Err(LakeError::MetadataConflict(format!(
                    "tablet {} version {} does not follow {}",
                    metadata.id, metadata.version, prev.version
                )));
            }
        }
        let published = Arc::new(metadata);
        *current = Some(Arc::clone(&published));
        log::info!(
            "Published tablet {} version {}",
            published.id,
            published.version
        );
        Ok(published)
    }
}
