use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Root location of tablet data, e.g. `file:///var/lib/lake`,
    /// `s3://bucket/lake` or `memory://`.
    #[serde(default = "StorageConfig::default_root")]
    pub root: String,
    #[serde(default)]
    pub s3: S3Config,
}

impl StorageConfig {
    fn default_root() -> String {
        String::from("file:///var/lib/lake")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: Self::default_root(),
            s3: S3Config::default(),
        }
    }
}

/// Connection settings for `s3://` roots. The bucket is taken from the
/// root location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct S3Config {
    #[serde(default = "S3Config::default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible stores.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl S3Config {
    pub fn default_region() -> String {
        String::from("us-east-1")
    }
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: Self::default_region(),
            endpoint: None,
        }
    }
}
