//! Error types for podcast-dl
//!
//! Configuration, network and feed errors are never recovered inside the crate: they
//! propagate to the caller and end the run. Conditions that the browser helper tolerates
//! (missing cookie banner, no virtual display, rejected click) are not errors at all and
//! are reported through the outcome types in [`crate::browser`].

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for podcast-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for podcast-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file could not be loaded or failed validation
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The request could not be sent or the body could not be read
    #[error("network error fetching {url}: {source}")]
    Network {
        /// URL that was being fetched
        url: String,
        /// Underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("HTTP {status} fetching {url}")]
    Http {
        /// URL that was being fetched
        url: String,
        /// Response status code
        status: u16,
    },

    /// The feed body is not well-formed XML
    #[error("malformed feed {url}: {message}")]
    FeedParse {
        /// Feed URL (empty when parsing in-memory content)
        url: String,
        /// Parser message
        message: String,
    },

    /// No output filename can be derived from a media URL
    #[error("invalid media URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Browser session error
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),
}

impl Error {
    /// Attach the feed URL to a parse error raised on in-memory content
    pub(crate) fn with_feed_url(self, feed_url: &str) -> Self {
        match self {
            Error::FeedParse { message, .. } => Error::FeedParse {
                url: feed_url.to_string(),
                message,
            },
            other => other,
        }
    }
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist
    #[error("config file not found: {}", path.display())]
    NotFound {
        /// Path that was looked up
        path: PathBuf,
    },

    /// The configuration file exists but could not be read
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        /// Path of the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML
    #[error("invalid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The document is valid YAML but not a key/value mapping
    #[error("config document must be a mapping of keys to values")]
    NotAMapping,

    /// A required key is absent
    #[error("missing required field: {field}")]
    MissingField {
        /// Name of the missing key
        field: &'static str,
    },

    /// A key is present with the wrong shape
    #[error("{field} must be {expected}")]
    WrongType {
        /// Name of the key
        field: &'static str,
        /// Human-readable description of the accepted shape
        expected: &'static str,
    },
}

/// Browser session errors
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Launch options could not be turned into a driver configuration
    #[error("invalid browser configuration: {0}")]
    Config(String),

    /// Error reported by the browser driver
    #[error(transparent)]
    Driver(#[from] chromiumoxide::error::CdpError),
}
