//! # podcast-dl
//!
//! Downloads the newest episode of iVoox podcasts.
//!
//! For every podcast page URL in the configuration the program identifier is pulled out of
//! the URL, turned into the podcast's RSS feed URL, and the enclosure of the first feed item
//! is streamed to the configured output directory.
//!
//! A small Chrome session helper ([`browser`]) is included for pages that can only be read
//! through a real browser.
//!
//! ## Quick Start
//!
//! ```no_run
//! use podcast_dl::{Pipeline, PodcastConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PodcastConfig::load("config.yaml")?;
//!     let pipeline = Pipeline::from_config(&config)?;
//!
//!     let summary = pipeline.run(&config.podcast_url).await?;
//!     println!("{} episodes saved", summary.saved());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Browser session helper
pub mod browser;
/// Configuration loading
pub mod config;
/// Episode download
pub mod download;
/// Error types
pub mod error;
/// Feed identifier extraction and first-enclosure lookup
pub mod feed;
/// Per-URL download pipeline
pub mod pipeline;
/// Outcome types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::PodcastConfig;
pub use download::download_episode;
pub use error::{BrowserError, ConfigError, Error, Result};
pub use feed::{FeedClient, build_feed_url, extract_id, first_enclosure_url};
pub use pipeline::Pipeline;
pub use types::{EpisodeOutcome, RunSummary};
pub use utils::episode_filename;
