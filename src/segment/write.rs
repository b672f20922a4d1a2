use arrow::datatypes::SchemaRef;
use arrow::ipc::writer::StreamWriter;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;

use crate::core::LakeError;
use crate::fs::WritableFile;

use super::format::{
    BlockEntry, FOOTER_TRAILER_SIZE, HEADER_SIZE, INDEX_ENTRY_SIZE, MAGIC, SegmentFooter, VERSION,
};

/// Exact sizes reported once a segment is finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SegmentFooterInfo {
    pub segment_size: u64,
    pub index_size: u64,
    pub footer_position: u64,
}

/// Encoder for one segment file.
///
/// Rows are buffered until [`finalize`](SegmentWriter::finalize); after it
/// returns the file is immutable and the writer must not be reused.
#[async_trait]
pub trait SegmentWriter: Send {
    async fn init(&mut self) -> Result<(), LakeError>;

    async fn append(&mut self, batch: &RecordBatch) -> Result<(), LakeError>;

    /// Approximate bytes `finalize` would write. Never decreases.
    fn estimate_segment_size(&self) -> u64;

    fn num_rows_written(&self) -> u64;

    async fn finalize(&mut self) -> Result<SegmentFooterInfo, LakeError>;
}

/// Creates the segment writer for a freshly opened file.
pub trait SegmentWriterBuilder: Send + Sync {
    fn build(
        &self,
        file: Box<dyn WritableFile>,
        segment_id: u32,
        schema: SchemaRef,
    ) -> Box<dyn SegmentWriter>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct IpcSegmentBuilder;

impl SegmentWriterBuilder for IpcSegmentBuilder {
    fn build(
        &self,
        file: Box<dyn WritableFile>,
        segment_id: u32,
        schema: SchemaRef,
    ) -> Box<dyn SegmentWriter> {
        Box::new(IpcSegmentWriter::new(file, segment_id, schema))
    }
}

/// Segment writer storing each appended batch as one Arrow IPC block.
///
/// Format: `[LSEG magic][version u32 LE][blocks...][index][trailer]`, see
/// `SegmentFooter::encode` for the footer layout.
pub struct IpcSegmentWriter {
    file: Box<dyn WritableFile>,
    segment_id: u32,
    schema: SchemaRef,
    blocks: Vec<Vec<u8>>,
    block_rows: Vec<u64>,
    buffered_bytes: u64,
    num_rows: u64,
    initialized: bool,
    finalized: bool,
}

impl IpcSegmentWriter {
    pub fn new(file: Box<dyn WritableFile>, segment_id: u32, schema: SchemaRef) -> Self {
        Self {
            file,
            segment_id,
            schema,
            blocks: Vec::new(),
            block_rows: Vec::new(),
            buffered_bytes: 0,
            num_rows: 0,
            initialized: false,
            finalized: false,
        }
    }

    pub fn segment_id(&self) -> u32 {
        self.segment_id
    }

    fn encode_block(batch: &RecordBatch) -> Result<Vec<u8>, LakeError> {
        let encode = || -> Result<Vec<u8>, arrow::error::ArrowError> {
            let mut buf = Vec::new();
            let mut writer = StreamWriter::try_new(&mut buf, batch.schema().as_ref())?;
            writer.write(batch)?;
            writer.finish()?;
            drop(writer);
            Ok(buf)
        };
        encode().map_err(|e| LakeError::AppendError(format!("encoding batch: {e}")))
    }
}

#[async_trait]
impl SegmentWriter for IpcSegmentWriter {
    async fn init(&mut self) -> Result<(), LakeError> {
        if self.initialized {
            return Err(LakeError::SegmentInitError(format!(
                "segment {} already initialized",
                self.segment_id
            )));
        }
        if self.schema.fields().is_empty() {
            return Err(LakeError::SegmentInitError(
                "schema has no columns".to_string(),
            ));
        }
        let mut header = Vec::with_capacity(HEADER_SIZE);
        header.extend_from_slice(MAGIC);
        header.extend_from_slice(&VERSION.to_le_bytes());
        self.file
            .append(&header)
            .await
            .map_err(|e| LakeError::SegmentInitError(format!("writing header: {e}")))?;
        self.initialized = true;
        Ok(())
    }

    async fn append(&mut self, batch: &RecordBatch) -> Result<(), LakeError> {
        if !self.initialized || self.finalized {
            return Err(LakeError::AppendError(format!(
                "segment {} is not open for writes",
                self.segment_id
            )));
        }
        if batch.schema().fields() != self.schema.fields() {
            return Err(LakeError::AppendError(format!(
                "batch schema {:?} does not match segment schema {:?}",
                batch.schema().fields(),
                self.schema.fields()
            )));
        }
        let block = Self::encode_block(batch)?;
        self.buffered_bytes += block.len() as u64;
        self.num_rows += batch.num_rows() as u64;
        self.block_rows.push(batch.num_rows() as u64);
        self.blocks.push(block);
        Ok(())
    }

    fn estimate_segment_size(&self) -> u64 {
        (HEADER_SIZE + self.blocks.len() * INDEX_ENTRY_SIZE + FOOTER_TRAILER_SIZE) as u64
            + self.buffered_bytes
    }

    fn num_rows_written(&self) -> u64 {
        self.num_rows
    }

    async fn finalize(&mut self) -> Result<SegmentFooterInfo, LakeError> {
        if !self.initialized || self.finalized {
            return Err(LakeError::FinalizeError(format!(
                "segment {} cannot be finalized twice or before init",
                self.segment_id
            )));
        }
        self.finalized = true;

        let mut offset = HEADER_SIZE as u64;
        let mut entries = Vec::with_capacity(self.blocks.len());
        for (block, rows) in self.blocks.iter().zip(&self.block_rows) {
            self.file
                .append(block)
                .await
                .map_err(|e| LakeError::FinalizeError(format!("writing block: {e}")))?;
            let size = block.len() as u64;
            entries.push(BlockEntry {
                offset,
                size,
                rows: *rows,
            });
            offset += size;
        }
        self.blocks.clear();

        let footer = SegmentFooter {
            blocks: entries,
            num_rows: self.num_rows,
            segment_id: self.segment_id,
        };
        let mut footer_buf = Vec::with_capacity(footer.encoded_size());
        footer.encode(&mut footer_buf);
        self.file
            .append(&footer_buf)
            .await
            .map_err(|e| LakeError::FinalizeError(format!("writing footer: {e}")))?;
        self.file
            .close()
            .await
            .map_err(|e| LakeError::FinalizeError(format!("closing {}: {e}", self.file.path())))?;

        Ok(SegmentFooterInfo {
            segment_size: self.file.size(),
            index_size: footer.index_size() as u64,
            footer_position: offset,
        })
    }
}
