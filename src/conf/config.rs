use crate::{
    conf::{StorageConfig, WriterConfig},
    core::LakeError::{self, ConfigParsingError},
};
use config::Config as CConfig;
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "LAKE";

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub writer: WriterConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    pub fn from_str(toml_str: &str) -> Result<Config, LakeError> {
        let config = CConfig::builder()
            .add_source(config::File::from_str(toml_str, config::FileFormat::Toml))
            .build()
            .map_err(|e| ConfigParsingError(e.to_string()))?
            .try_deserialize::<Config>()
            .map_err(|e| ConfigParsingError(e.to_string()))?;
        Ok(config)
    }

    /// Load from an optional TOML file, then apply `LAKE_<SECTION>__<KEY>`
    /// environment overrides.
    pub fn load(path: Option<&str>) -> Result<Config, LakeError> {
        let mut builder = CConfig::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| ConfigParsingError(e.to_string()))?
            .try_deserialize::<Config>()
            .map_err(|e| ConfigParsingError(e.to_string()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::S3Config;

    #[test]
    fn load_correct_toml() {
        let toml = r#"
        [writer]
        max_segment_file_size = 4096

        [storage]
        root = "s3://lake/tablets"

        [storage.s3]
        endpoint = "http://localhost:9000"
        "#;
        let conf = Config::from_str(toml);
        assert_eq!(
            conf,
            Ok(Config {
                writer: WriterConfig {
                    max_segment_file_size: 4096
                },
                storage: StorageConfig {
                    root: String::from("s3://lake/tablets"),
                    s3: S3Config {
                        region: String::from("us-east-1"),
                        endpoint: Some(String::from("http://localhost:9000")),
                    },
                }
            })
        );
    }

    #[test]
    fn load_empty_toml_uses_defaults() {
        let conf = Config::from_str("").unwrap();
        assert_eq!(conf, Config::default());
    }

    #[test]
    fn reject_unknown_field() {
        let toml = r#"
        [writer]
        max_segment_size = 1
        "#;
        let err = Config::from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigParsingError(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("lake.toml");
        std::fs::write(&path, "[writer]\nmax_segment_file_size = 2048\n").unwrap();
        let conf = Config::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(conf.writer.max_segment_file_size, 2048);
    }
}
