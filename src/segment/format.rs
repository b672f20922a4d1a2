use crate::core::LakeError;

pub(crate) const MAGIC: &[u8; 4] = b"LSEG";
pub(crate) const VERSION: u32 = 1;
pub(crate) const HEADER_SIZE: usize = 8; // magic (4) + version (4)
pub(crate) const INDEX_ENTRY_SIZE: usize = 24; // offset (8) + size (8) + rows (8)
/// num_blocks (4) + num_rows (8) + segment_id (4) + footer_size (4)
pub(crate) const FOOTER_TRAILER_SIZE: usize = 20;

/// Location of one encoded batch inside a segment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockEntry {
    pub offset: u64,
    pub size: u64,
    pub rows: u64,
}

/// Decoded footer of a segment file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SegmentFooter {
    pub blocks: Vec<BlockEntry>,
    pub num_rows: u64,
    pub segment_id: u32,
}

impl SegmentFooter {
    pub fn index_size(&self) -> usize {
        self.blocks.len() * INDEX_ENTRY_SIZE
    }

    /// Footer bytes including the trailing length word.
    pub fn encoded_size(&self) -> usize {
        self.index_size() + FOOTER_TRAILER_SIZE
    }

    /// `[index entries][num_blocks u32][num_rows u64][segment_id u32][footer_size u32]`,
    /// all little-endian. `footer_size` excludes itself.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        for block in &self.blocks {
            buf.extend_from_slice(&block.offset.to_le_bytes());
            buf.extend_from_slice(&block.size.to_le_bytes());
            buf.extend_from_slice(&block.rows.to_le_bytes());
        }
        buf.extend_from_slice(&(self.blocks.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.num_rows.to_le_bytes());
        buf.extend_from_slice(&self.segment_id.to_le_bytes());
        let footer_size = (self.encoded_size() - 4) as u32;
        buf.extend_from_slice(&footer_size.to_le_bytes());
    }

    /// Decode the footer from the tail of a whole segment file. Returns the
    /// footer and its start position.
    pub fn decode(data: &[u8]) -> Result<(Self, usize), LakeError> {
        let len = data.len();
        let min_size = HEADER_SIZE + FOOTER_TRAILER_SIZE;
        if len < min_size {
            return Err(LakeError::SegmentFormatError(format!(
                "file too small: {len} bytes, minimum {min_size}"
            )));
        }

        let footer_size = read_u32_le(data, len - 4)? as usize;
        if footer_size + 4 > len - HEADER_SIZE || footer_size + 4 < FOOTER_TRAILER_SIZE {
            return Err(LakeError::SegmentFormatError(format!(
                "footer size {footer_size} exceeds available data"
            )));
        }
        let footer_start = len - 4 - footer_size;
        let trailer = len - FOOTER_TRAILER_SIZE;

        let num_blocks = read_u32_le(data, trailer)? as usize;
        let num_rows = read_u64_le(data, trailer + 4)?;
        let segment_id = read_u32_le(data, trailer + 12)?;

        if footer_start + num_blocks * INDEX_ENTRY_SIZE != trailer {
            return Err(LakeError::SegmentFormatError(format!(
                "index of {num_blocks} blocks does not match footer size {footer_size}"
            )));
        }

        let mut blocks = Vec::with_capacity(num_blocks);
        let mut pos = footer_start;
        for _ in 0..num_blocks {
            let offset = read_u64_le(data, pos)?;
            let size = read_u64_le(data, pos + 8)?;
            let rows = read_u64_le(data, pos + 16)?;
            pos += INDEX_ENTRY_SIZE;

            let end = offset.checked_add(size).ok_or_else(|| {
                LakeError::SegmentFormatError(format!("block range overflow at offset {offset}"))
            })?;
            if offset < HEADER_SIZE as u64 || end > footer_start as u64 {
                return Err(LakeError::SegmentFormatError(format!(
                    "block range {offset}..{end} exceeds data region"
                )));
            }
            blocks.push(BlockEntry { offset, size, rows });
        }

        let indexed_rows: u64 = blocks.iter().map(|b| b.rows).sum();
        if indexed_rows != num_rows {
            return Err(LakeError::SegmentFormatError(format!(
                "footer reports {num_rows} rows, index holds {indexed_rows}"
            )));
        }

        Ok((
            Self {
                blocks,
                num_rows,
                segment_id,
            },
            footer_start,
        ))
    }
}

pub(crate) fn read_u32_le(data: &[u8], offset: usize) -> Result<u32, LakeError> {
    let bytes = data
        .get(offset..offset + 4)
        .and_then(|b| <[u8; 4]>::try_from(b).ok())
        .ok_or_else(|| out_of_bounds(offset, data.len()))?;
    Ok(u32::from_le_bytes(bytes))
}

pub(crate) fn read_u64_le(data: &[u8], offset: usize) -> Result<u64, LakeError> {
    let bytes = data
        .get(offset..offset + 8)
        .and_then(|b| <[u8; 8]>::try_from(b).ok())
        .ok_or_else(|| out_of_bounds(offset, data.len()))?;
    Ok(u64::from_le_bytes(bytes))
}

fn out_of_bounds(offset: usize, len: usize) -> LakeError {
    LakeError::SegmentFormatError(format!("read out of bounds: offset {offset}, len {len}"))
}
