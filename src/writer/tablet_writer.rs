use std::sync::Arc;

use arrow::datatypes::{Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use log::{debug, info, warn};

use crate::conf::{MAX_ROWS_PER_SEGMENT, WriterConfig};
use crate::core::LakeError;
use crate::fs::FileSystem;
use crate::segment::{
    IpcSegmentBuilder, SegmentWriter, SegmentWriterBuilder, random_segment_filename,
};
use crate::tablet::Tablet;

use super::rotation::{SegmentProgress, should_rotate};

/// Everything a finished writer produced. The caller folds it into a new
/// tablet metadata version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriterOutput {
    /// Segment file names in creation order.
    pub files: Vec<String>,
    pub data_size: u64,
    pub num_rows: u64,
}

/// Turns a stream of batches into size-bounded segment files of one tablet.
///
/// Lifecycle: [`open`](Self::open), any number of [`write`](Self::write) and
/// [`flush`](Self::flush) calls, then [`finish`](Self::finish) to keep the
/// files, and always [`close`](Self::close). Closing a writer that never
/// finished deletes every file it created.
///
/// `open` is synchronous and only touches memory, so it is safe to call from
/// a task that must not block its worker thread. Every method that may touch
/// storage is `async`.
///
/// A writer has a single owner; methods take `&mut self`. Several writers
/// may target the same tablet concurrently since file names are random.
pub struct TabletWriter {
    tablet: Arc<dyn Tablet>,
    fs: Arc<dyn FileSystem>,
    segment_builder: Arc<dyn SegmentWriterBuilder>,
    max_segment_file_size: u64,
    schema: Option<SchemaRef>,
    seg_writer: Option<Box<dyn SegmentWriter>>,
    next_segment_id: u32,
    files: Vec<String>,
    num_rows: u64,
    data_size: u64,
    finished: bool,
    closed: bool,
}

impl TabletWriter {
    pub fn new(tablet: Arc<dyn Tablet>, fs: Arc<dyn FileSystem>, config: &WriterConfig) -> Self {
        Self {
            tablet,
            fs,
            segment_builder: Arc::new(IpcSegmentBuilder),
            max_segment_file_size: config.max_segment_file_size,
            schema: None,
            seg_writer: None,
            next_segment_id: 0,
            files: Vec::new(),
            num_rows: 0,
            data_size: 0,
            finished: false,
            closed: false,
        }
    }

    pub fn with_segment_builder(mut self, segment_builder: Arc<dyn SegmentWriterBuilder>) -> Self {
        self.segment_builder = segment_builder;
        self
    }

    /// Validate in-memory configuration. Performs no I/O.
    pub fn open(&mut self) -> Result<(), LakeError> {
        if self.max_segment_file_size == 0 {
            return Err(LakeError::ConfigParsingError(
                "max_segment_file_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Append a batch, rotating to a new segment first when the active one
    /// is full. On error the writer keeps the state of the last step that
    /// succeeded; nothing is retried. A writer that saw an error should be
    /// closed, not finished.
    pub async fn write(&mut self, batch: &RecordBatch) -> Result<(), LakeError> {
        self.check_writable()?;
        let rows = batch.num_rows() as u64;
        if rows >= MAX_ROWS_PER_SEGMENT {
            return Err(LakeError::RowLimitExceeded {
                rows,
                limit: MAX_ROWS_PER_SEGMENT,
            });
        }

        let progress = self.seg_writer.as_ref().map(|w| SegmentProgress {
            estimated_size: w.estimate_segment_size(),
            rows_written: w.num_rows_written(),
        });
        if should_rotate(progress, rows, self.max_segment_file_size) {
            self.flush_segment_writer().await?;
            self.reset_segment_writer().await?;
        }

        let seg_writer = self
            .seg_writer
            .as_mut()
            .ok_or_else(|| LakeError::InvalidState("no active segment".to_string()))?;
        seg_writer.append(batch).await?;
        self.num_rows += rows;
        Ok(())
    }

    /// Finalize the active segment, if any. A second flush without an
    /// intervening write does nothing.
    pub async fn flush(&mut self) -> Result<(), LakeError> {
        self.flush_segment_writer().await
    }

    /// Flush and mark the writer finished, handing ownership of the created
    /// files to the caller.
    pub async fn finish(&mut self) -> Result<(), LakeError> {
        if self.closed {
            return Err(LakeError::InvalidState(
                "tablet writer is closed".to_string(),
            ));
        }
        self.flush_segment_writer().await?;
        self.finished = true;
        info!(
            tablet_id = self.tablet.id(),
            files = self.files.len(),
            rows = self.num_rows,
            bytes = self.data_size;
            "Tablet writer finished"
        );
        Ok(())
    }

    /// Release the writer. Unless it finished, every created file is deleted
    /// on a best-effort basis; delete failures are logged and dropped. The
    /// file list is empty afterwards.
    pub async fn close(&mut self) {
        // An unfinalized segment is abandoned, its file goes with the rest.
        self.seg_writer = None;

        if !self.finished && !self.files.is_empty() {
            warn!(
                "Tablet {} writer closed before finish, deleting {} files",
                self.tablet.id(),
                self.files.len()
            );
            for name in &self.files {
                let path = match self.tablet.segment_location(name) {
                    Ok(path) => path,
                    Err(e) => {
                        warn!("Cannot resolve {name} for deletion: {e}");
                        continue;
                    }
                };
                if let Err(e) = self.fs.delete_file(&path).await {
                    warn!("Failed to delete {path}: {e}");
                }
            }
        }

        self.files.clear();
        self.closed = true;
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn num_rows(&self) -> u64 {
        self.num_rows
    }

    pub fn data_size(&self) -> u64 {
        self.data_size
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn output(&self) -> WriterOutput {
        WriterOutput {
            files: self.files.clone(),
            data_size: self.data_size,
            num_rows: self.num_rows,
        }
    }

    fn check_writable(&self) -> Result<(), LakeError> {
        if self.closed {
            return Err(LakeError::InvalidState(
                "tablet writer is closed".to_string(),
            ));
        }
        if self.finished {
            return Err(LakeError::InvalidState(
                "tablet writer is already finished".to_string(),
            ));
        }
        Ok(())
    }

    async fn resolve_schema(&mut self) -> Result<SchemaRef, LakeError> {
        if let Some(schema) = &self.schema {
            return Ok(Arc::clone(schema));
        }
        let tablet_schema = self.tablet.get_schema().await?;
        let schema: SchemaRef = Arc::new(Schema::from(tablet_schema.as_ref()));
        self.schema = Some(Arc::clone(&schema));
        Ok(schema)
    }

    async fn reset_segment_writer(&mut self) -> Result<(), LakeError> {
        let schema = self.resolve_schema().await?;
        let name = random_segment_filename();
        let path = self.tablet.segment_location(&name)?;
        let file = self.fs.new_writable_file(&path).await?;
        // Tracked from here on so that close() can roll it back.
        self.files.push(name);

        let segment_id = self.next_segment_id;
        self.next_segment_id += 1;
        let mut seg_writer = self.segment_builder.build(file, segment_id, schema);
        seg_writer.init().await?;

        debug!("Opened segment {segment_id} at {path}");
        self.seg_writer = Some(seg_writer);
        Ok(())
    }

    async fn flush_segment_writer(&mut self) -> Result<(), LakeError> {
        if let Some(seg_writer) = self.seg_writer.as_mut() {
            let info = seg_writer.finalize().await?;
            self.data_size += info.segment_size;
            self.seg_writer = None;
            debug!(
                "Finalized segment: {} bytes, index {} bytes, footer at {}",
                info.segment_size, info.index_size, info.footer_position
            );
        }
        Ok(())
    }
}
