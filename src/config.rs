//! Configuration for podcast-dl
//!
//! The configuration is a small YAML document:
//!
//! ```yaml
//! downloaded_podcast_audio: ./downloaded_podcast_audio
//! podcast_url:
//!   - https://www.ivoox.com/podcast-example_sq_f123456_1.html
//! ```
//!
//! Both keys are required and there are no defaults.

use crate::error::{ConfigError, Result};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

/// Key holding the output directory
pub const OUTPUT_DIR_KEY: &str = "downloaded_podcast_audio";

/// Key holding the list of podcast page URLs
pub const PODCAST_URLS_KEY: &str = "podcast_url";

/// Validated podcast-dl configuration
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PodcastConfig {
    /// Directory the episodes are written to
    pub downloaded_podcast_audio: PathBuf,

    /// Podcast page URLs, processed in order
    pub podcast_url: Vec<String>,
}

impl PodcastConfig {
    /// Load and validate a configuration file
    ///
    /// # Errors
    /// - [`ConfigError::NotFound`] if `path` does not exist
    /// - [`ConfigError::Read`] if it cannot be read
    /// - [`ConfigError::Parse`] on malformed YAML
    /// - [`ConfigError::MissingField`] / [`ConfigError::WrongType`] on validation failure
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_yaml_str(&text)?;
        tracing::debug!(
            path = %path.display(),
            urls = config.podcast_url.len(),
            "loaded configuration"
        );
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(text).map_err(ConfigError::Parse)?;
        let Value::Mapping(mapping) = value else {
            return Err(ConfigError::NotAMapping.into());
        };

        validate(&mapping)?;

        let config = serde_yaml::from_value(Value::Mapping(mapping)).map_err(ConfigError::Parse)?;
        Ok(config)
    }

    /// Output directory
    pub fn output_dir(&self) -> &Path {
        &self.downloaded_podcast_audio
    }
}

/// Required keys first, then shapes, so a missing key is always reported as missing.
fn validate(mapping: &Mapping) -> std::result::Result<(), ConfigError> {
    let output_dir = mapping
        .get(OUTPUT_DIR_KEY)
        .ok_or(ConfigError::MissingField {
            field: OUTPUT_DIR_KEY,
        })?;
    let urls = mapping
        .get(PODCAST_URLS_KEY)
        .ok_or(ConfigError::MissingField {
            field: PODCAST_URLS_KEY,
        })?;

    if !output_dir.is_string() {
        return Err(ConfigError::WrongType {
            field: OUTPUT_DIR_KEY,
            expected: "a path string",
        });
    }

    match urls {
        Value::Sequence(items) if items.iter().all(Value::is_string) => Ok(()),
        _ => Err(ConfigError::WrongType {
            field: PODCAST_URLS_KEY,
            expected: "an array of strings",
        }),
    }
}
