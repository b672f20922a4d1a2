use serde::{Deserialize, Serialize};

/// Hard per-segment row ceiling. Row ordinals inside a segment are encoded
/// as signed 32-bit integers.
pub const MAX_ROWS_PER_SEGMENT: u64 = i32::MAX as u64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WriterConfig {
    /// Rotation threshold compared against a segment's size estimate. A
    /// segment may overshoot it by at most one batch.
    #[serde(default = "WriterConfig::default_max_segment_file_size")]
    pub max_segment_file_size: u64,
}

impl WriterConfig {
    fn default_max_segment_file_size() -> u64 {
        1024 * 1024 * 1024
    }

    pub fn with_max_segment_file_size(max_segment_file_size: u64) -> Self {
        Self {
            max_segment_file_size,
        }
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_segment_file_size: Self::default_max_segment_file_size(),
        }
    }
}
