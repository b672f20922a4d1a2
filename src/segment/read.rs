use std::io::Cursor;

use arrow::datatypes::SchemaRef;
use arrow::ipc::reader::StreamReader;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;

use crate::core::LakeError;
use crate::fs::FileSystem;

use super::format::{HEADER_SIZE, MAGIC, SegmentFooter, VERSION, read_u32_le};

/// Decoded view over a finalized segment file.
#[derive(Debug)]
pub struct SegmentReader {
    segment_id: u32,
    num_rows: u64,
    batches: Vec<RecordBatch>,
}

impl SegmentReader {
    pub async fn open(fs: &dyn FileSystem, path: &str) -> Result<Self, LakeError> {
        let data = fs.read_file(path).await?;
        Self::from_bytes(data)
    }

    /// Validate header and footer, then decode every block in file order.
    pub fn from_bytes(data: Bytes) -> Result<Self, LakeError> {
        if data.len() < HEADER_SIZE {
            return Err(LakeError::SegmentFormatError(format!(
                "file too small: {} bytes, minimum {HEADER_SIZE}",
                data.len()
            )));
        }
        if &data[0..4] != MAGIC {
            return Err(LakeError::SegmentFormatError(format!(
                "bad magic: expected LSEG, got {:?}",
                &data[0..4]
            )));
        }
        let version = read_u32_le(&data, 4)?;
        if version != VERSION {
            return Err(LakeError::SegmentFormatError(format!(
                "unsupported version: {version}, expected {VERSION}"
            )));
        }

        let (footer, _) = SegmentFooter::decode(&data)?;

        let mut batches = Vec::new();
        for block in &footer.blocks {
            let bytes = data.slice(block.offset as usize..(block.offset + block.size) as usize);
            let reader = StreamReader::try_new(Cursor::new(bytes), None)?;
            let mut rows = 0u64;
            for batch in reader {
                let batch = batch?;
                rows += batch.num_rows() as u64;
                batches.push(batch);
            }
            if rows != block.rows {
                return Err(LakeError::SegmentFormatError(format!(
                    "block at offset {} decoded {rows} rows, index says {}",
                    block.offset, block.rows
                )));
            }
        }

        Ok(Self {
            segment_id: footer.segment_id,
            num_rows: footer.num_rows,
            batches,
        })
    }

    pub fn segment_id(&self) -> u32 {
        self.segment_id
    }

    pub fn num_rows(&self) -> u64 {
        self.num_rows
    }

    pub fn schema(&self) -> Option<SchemaRef> {
        self.batches.first().map(|b| b.schema())
    }

    /// Batches in the order they were appended.
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }
}
