use crate::conf::MAX_ROWS_PER_SEGMENT;

/// Snapshot of the active segment used by the rotation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SegmentProgress {
    pub estimated_size: u64,
    pub rows_written: u64,
}

/// Whether the active segment must be finalized before appending a batch of
/// `incoming_rows` rows. Checked in order: no active segment, size estimate
/// at or over the threshold, row count reaching the per-segment ceiling.
///
/// The size check looks at what is already buffered, so a segment can end
/// up at most one batch past `max_segment_file_size`.
pub(crate) fn should_rotate(
    active: Option<SegmentProgress>,
    incoming_rows: u64,
    max_segment_file_size: u64,
) -> bool {
    match active {
        None => true,
        Some(progress) => {
            progress.estimated_size >= max_segment_file_size
                || progress.rows_written.saturating_add(incoming_rows) >= MAX_ROWS_PER_SEGMENT
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn progress(estimated_size: u64, rows_written: u64) -> Option<SegmentProgress> {
        Some(SegmentProgress {
            estimated_size,
            rows_written,
        })
    }

    #[rstest]
    #[case::no_segment(None, 1, true)]
    #[case::no_segment_empty_batch(None, 0, true)]
    #[case::below_threshold(progress(1023, 10), 100, false)]
    #[case::at_threshold(progress(1024, 10), 100, true)]
    #[case::over_threshold(progress(5000, 10), 1, true)]
    #[case::rows_just_below(progress(0, MAX_ROWS_PER_SEGMENT - 101), 100, false)]
    #[case::rows_reach_ceiling(progress(0, MAX_ROWS_PER_SEGMENT - 100), 100, true)]
    #[case::rows_past_ceiling(progress(0, MAX_ROWS_PER_SEGMENT - 1), 5, true)]
    #[case::rows_saturate(progress(0, u64::MAX), 5, true)]
    fn test_should_rotate(
        #[case] active: Option<SegmentProgress>,
        #[case] incoming_rows: u64,
        #[case] expected: bool,
    ) {
        assert_eq!(should_rotate(active, incoming_rows, 1024), expected);
    }
}
