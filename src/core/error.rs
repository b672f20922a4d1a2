use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum LakeError {
    #[error("Cannot parse config: {0}")]
    ConfigParsingError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Arrow error: {0}")]
    ArrowError(String),
    #[error("Cannot resolve schema: {0}")]
    SchemaResolutionError(String),
    #[error("Cannot resolve path: {0}")]
    PathResolutionError(String),
    #[error("Cannot create writable stream: {0}")]
    StreamCreationError(String),
    #[error("Segment init error: {0}")]
    SegmentInitError(String),
    #[error("Append error: {0}")]
    AppendError(String),
    #[error("Finalize error: {0}")]
    FinalizeError(String),
    #[error("Row limit exceeded: {rows} rows, limit {limit}")]
    RowLimitExceeded { rows: u64, limit: u64 },
    #[error("Segment format error: {0}")]
    SegmentFormatError(String),
    #[error("Metadata conflict: {0}")]
    MetadataConflict(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl From<std::io::Error> for LakeError {
    fn from(err: std::io::Error) -> Self {
        LakeError::IoError(err.to_string())
    }
}

impl From<object_store::Error> for LakeError {
    fn from(err: object_store::Error) -> Self {
        LakeError::IoError(err.to_string())
    }
}

impl From<arrow::error::ArrowError> for LakeError {
    fn from(err: arrow::error::ArrowError) -> Self {
        LakeError::ArrowError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let err: LakeError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err, LakeError::IoError("gone".to_string()));
    }

    #[test]
    fn test_row_limit_message() {
        let err = LakeError::RowLimitExceeded {
            rows: 10,
            limit: 5,
        };
        assert_eq!(err.to_string(), "Row limit exceeded: 10 rows, limit 5");
    }
}
