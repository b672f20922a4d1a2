//! Test and benchmark utilities.
//!
//! This module is only available in unit tests or when the `testutil`
//! feature is enabled.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use arrow::array::{Array, ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use bytes::Bytes;

use crate::core::{ColumnSchema, DType, LakeError, TabletSchema};
use crate::fs::{FileSystem, ObjectFileSystem, WritableFile};
use crate::segment::{SegmentFooterInfo, SegmentWriter, SegmentWriterBuilder};
use crate::tablet::{LakeTablet, MetadataCell, Tablet, TabletMetadata};

/// Two-column schema: `k` (non-null Int64 key) and `v` (nullable Utf8).
pub fn sample_schema() -> TabletSchema {
    TabletSchema {
        id: 1,
        keys: vec!["k".to_string()],
        columns: vec![
            ColumnSchema::new("k", DType::Int64, false),
            ColumnSchema::new("v", DType::Utf8, true),
        ],
    }
}

pub fn sample_arrow_schema() -> SchemaRef {
    Arc::new(Schema::from(&sample_schema()))
}

/// Batch of `rows` rows with keys `start..start + rows` and values `"v{key}"`.
pub fn sample_batch(start: i64, rows: usize) -> RecordBatch {
    let keys: Int64Array = (start..start + rows as i64).map(Some).collect();
    let values: StringArray = (start..start + rows as i64)
        .map(|k| Some(format!("v{k}")))
        .collect();
    let columns: Vec<ArrayRef> = vec![Arc::new(keys), Arc::new(values)];
    RecordBatch::try_new(sample_arrow_schema(), columns).unwrap()
}

/// Key column of a batch built by [`sample_batch`].
pub fn batch_keys(batch: &RecordBatch) -> Vec<i64> {
    let keys = batch
        .column(0)
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    (0..keys.len()).map(|i| keys.value(i)).collect()
}

/// Tablet rooted at `memory://lake/<id>` with [`sample_schema`] published as version 1.
pub fn memory_tablet(id: i64) -> Arc<LakeTablet> {
    let cell = MetadataCell::with_metadata(TabletMetadata::new(id, sample_schema()));
    Arc::new(LakeTablet::new(
        id,
        format!("memory://lake/{id}"),
        Arc::new(cell),
    ))
}

/// Tablet that counts schema lookups and can be told to fail them.
pub struct CountingTablet {
    root: String,
    schema: Option<Arc<TabletSchema>>,
    schema_calls: AtomicUsize,
}

impl CountingTablet {
    pub fn new(schema: Option<TabletSchema>) -> Self {
        Self {
            root: "memory://counting".to_string(),
            schema: schema.map(Arc::new),
            schema_calls: AtomicUsize::new(0),
        }
    }

    pub fn schema_calls(&self) -> usize {
        self.schema_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tablet for CountingTablet {
    fn id(&self) -> i64 {
        0
    }

    fn root_location(&self) -> &str {
        &self.root
    }

    fn segment_location(&self, name: &str) -> Result<String, LakeError> {
        Ok(format!("{}/data/{}", self.root, name))
    }

    async fn get_schema(&self) -> Result<Arc<TabletSchema>, LakeError> {
        self.schema_calls.fetch_add(1, Ordering::SeqCst);
        self.schema
            .clone()
            .ok_or_else(|| LakeError::SchemaResolutionError("schema unavailable".to_string()))
    }
}

/// In-memory filesystem that records delete attempts and can fail creates
/// or deletes on demand.
pub struct FaultyFileSystem {
    inner: ObjectFileSystem,
    fail_create: AtomicBool,
    fail_delete: AtomicBool,
    delete_attempts: Mutex<Vec<String>>,
}

impl Default for FaultyFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FaultyFileSystem {
    pub fn new() -> Self {
        Self {
            inner: ObjectFileSystem::in_memory(),
            fail_create: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            delete_attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &ObjectFileSystem {
        &self.inner
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn delete_attempts(&self) -> Vec<String> {
        self.delete_attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileSystem for FaultyFileSystem {
    async fn new_writable_file(&self, path: &str) -> Result<Box<dyn WritableFile>, LakeError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(LakeError::StreamCreationError(format!(
                "injected failure creating {path}"
            )));
        }
        self.inner.new_writable_file(path).await
    }

    async fn delete_file(&self, path: &str) -> Result<(), LakeError> {
        self.delete_attempts.lock().unwrap().push(path.to_string());
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(LakeError::IoError(format!("injected failure deleting {path}")));
        }
        self.inner.delete_file(path).await
    }

    async fn read_file(&self, path: &str) -> Result<Bytes, LakeError> {
        self.inner.read_file(path).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailPoint {
    #[default]
    Never,
    Init,
    Append,
    Finalize,
}

/// What a [`StubSegmentWriter`] saw by the time it was finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubSegmentRecord {
    pub segment_id: u32,
    pub path: String,
    pub batch_rows: Vec<u64>,
    pub segment_size: u64,
}

/// Segment builder with a deterministic size model: every row costs
/// `bytes_per_row` bytes. Finalized segments are recorded in order.
pub struct StubSegmentBuilder {
    bytes_per_row: u64,
    initial_rows: u64,
    fail_at: FailPoint,
    /// Segments still to be built with `fail_at`; later ones never fail.
    failures_left: AtomicUsize,
    records: Arc<Mutex<Vec<StubSegmentRecord>>>,
}

impl StubSegmentBuilder {
    pub fn new(bytes_per_row: u64) -> Self {
        Self {
            bytes_per_row,
            initial_rows: 0,
            fail_at: FailPoint::Never,
            failures_left: AtomicUsize::new(usize::MAX),
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Pretend every new segment already holds `rows` rows.
    pub fn with_initial_rows(mut self, rows: u64) -> Self {
        self.initial_rows = rows;
        self
    }

    pub fn failing_at(mut self, fail_at: FailPoint) -> Self {
        self.fail_at = fail_at;
        self
    }

    /// Only the first `segments` built segments hit the fail point.
    pub fn failing_first(self, segments: usize) -> Self {
        self.failures_left.store(segments, Ordering::SeqCst);
        self
    }

    pub fn records(&self) -> Vec<StubSegmentRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl SegmentWriterBuilder for StubSegmentBuilder {
    fn build(
        &self,
        file: Box<dyn WritableFile>,
        segment_id: u32,
        _schema: SchemaRef,
    ) -> Box<dyn SegmentWriter> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let fail_at = if failing { self.fail_at } else { FailPoint::Never };
        Box::new(StubSegmentWriter {
            file,
            segment_id,
            bytes_per_row: self.bytes_per_row,
            rows: self.initial_rows,
            batch_rows: Vec::new(),
            fail_at,
            records: Arc::clone(&self.records),
        })
    }
}

pub struct StubSegmentWriter {
    file: Box<dyn WritableFile>,
    segment_id: u32,
    bytes_per_row: u64,
    rows: u64,
    batch_rows: Vec<u64>,
    fail_at: FailPoint,
    records: Arc<Mutex<Vec<StubSegmentRecord>>>,
}

#[async_trait]
impl SegmentWriter for StubSegmentWriter {
    async fn init(&mut self) -> Result<(), LakeError> {
        if self.fail_at == FailPoint::Init {
            return Err(LakeError::SegmentInitError("injected init failure".to_string()));
        }
        Ok(())
    }

    async fn append(&mut self, batch: &RecordBatch) -> Result<(), LakeError> {
        if self.fail_at == FailPoint::Append {
            return Err(LakeError::AppendError("injected append failure".to_string()));
        }
        self.rows += batch.num_rows() as u64;
        self.batch_rows.push(batch.num_rows() as u64);
        Ok(())
    }

    fn estimate_segment_size(&self) -> u64 {
        self.rows * self.bytes_per_row
    }

    fn num_rows_written(&self) -> u64 {
        self.rows
    }

    async fn finalize(&mut self) -> Result<SegmentFooterInfo, LakeError> {
        if self.fail_at == FailPoint::Finalize {
            return Err(LakeError::FinalizeError("injected finalize failure".to_string()));
        }
        self.file.append(b"stub").await?;
        self.file.close().await?;
        let segment_size = self.estimate_segment_size();
        self.records.lock().unwrap().push(StubSegmentRecord {
            segment_id: self.segment_id,
            path: self.file.path().to_string(),
            batch_rows: self.batch_rows.clone(),
            segment_size,
        });
        Ok(SegmentFooterInfo {
            segment_size,
            index_size: 0,
            footer_position: segment_size,
        })
    }
}
