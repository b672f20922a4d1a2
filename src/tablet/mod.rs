mod metadata;

pub use metadata::{DelvecPage, DelvecPair, MetadataCell, RowsetMetadata, TabletMetadata};

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{LakeError, TabletSchema};

/// Sub-directory of the tablet root holding segment files.
pub const DATA_DIR: &str = "data";

/// A physical partition of a table, as seen by the writer.
#[async_trait]
pub trait Tablet: Send + Sync {
    fn id(&self) -> i64;

    fn root_location(&self) -> &str;

    /// Full path of the segment file `name`.
    fn segment_location(&self, name: &str) -> Result<String, LakeError>;

    /// Resolve the tablet's current schema. May perform I/O.
    async fn get_schema(&self) -> Result<Arc<TabletSchema>, LakeError>;
}

/// Tablet whose schema comes from the latest version in a [`MetadataCell`].
pub struct LakeTablet {
    id: i64,
    root: String,
    metadata: Arc<MetadataCell>,
}

impl LakeTablet {
    pub fn new(id: i64, root: impl Into<String>, metadata: Arc<MetadataCell>) -> Self {
        Self {
            id,
            root: normalize_root(root.into()),
            metadata,
        }
    }

    pub fn metadata(&self) -> &Arc<MetadataCell> {
        &self.metadata
    }
}

fn normalize_root(root: String) -> String {
    let trimmed = root.trim_end_matches('/');
    // keep a bare scheme such as `memory://` intact
    if trimmed.ends_with(':') {
        root
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl Tablet for LakeTablet {
    fn id(&self) -> i64 {
        self.id
    }

    fn root_location(&self) -> &str {
        &self.root
    }

    fn segment_location(&self, name: &str) -> Result<String, LakeError> {
        if name.is_empty() || name.contains('/') || name == "." || name == ".." {
            return Err(LakeError::PathResolutionError(format!(
                "invalid segment name '{name}' for tablet {}",
                self.id
            )));
        }
        Ok(format!("{}/{}/{}", self.root, DATA_DIR, name))
    }

    async fn get_schema(&self) -> Result<Arc<TabletSchema>, LakeError> {
        let metadata = self.metadata.current().await.ok_or_else(|| {
            LakeError::SchemaResolutionError(format!(
                "tablet {} has no published metadata",
                self.id
            ))
        })?;
        Ok(Arc::clone(&metadata.schema))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::sample_schema;
    use rstest::rstest;

    fn tablet() -> LakeTablet {
        let cell = MetadataCell::with_metadata(TabletMetadata::new(42, sample_schema()));
        LakeTablet::new(42, "memory://lake/42/", Arc::new(cell))
    }

    #[test]
    fn test_segment_location() {
        let tablet = tablet();
        assert_eq!(tablet.root_location(), "memory://lake/42");
        assert_eq!(
            tablet.segment_location("a.dat").unwrap(),
            "memory://lake/42/data/a.dat"
        );
    }

    #[rstest]
    #[case("")]
    #[case("..")]
    #[case("sub/a.dat")]
    fn test_invalid_segment_name(#[case] name: &str) {
        let err = tablet().segment_location(name).unwrap_err();
        assert!(matches!(err, LakeError::PathResolutionError(_)));
    }

    #[tokio::test]
    async fn test_schema_from_metadata() {
        let schema = tablet().get_schema().await.unwrap();
        assert_eq!(*schema, sample_schema());
    }

    #[tokio::test]
    async fn test_schema_without_metadata() {
        let tablet = LakeTablet::new(7, "memory://lake/7", Arc::new(MetadataCell::new()));
        let err = tablet.get_schema().await.unwrap_err();
        assert!(matches!(err, LakeError::SchemaResolutionError(_)));
    }
}
