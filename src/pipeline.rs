//! Per-URL pipeline: identifier -> feed URL -> first enclosure -> file on disk
//!
//! URLs are processed strictly one after another. A URL without an identifier and a feed
//! without an enclosure are reported as skips; every other failure ends the run.

use crate::config::PodcastConfig;
use crate::download::download_episode;
use crate::error::Result;
use crate::feed::{FeedClient, extract_id};
use crate::types::{EpisodeOutcome, RunSummary};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Downloads the newest episode of each podcast URL into one directory
#[derive(Clone, Debug)]
pub struct Pipeline {
    feeds: FeedClient,
    output_dir: PathBuf,
}

impl Pipeline {
    /// Create a pipeline against the public feed host
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::with_feed_client(FeedClient::new()?, output_dir))
    }

    /// Create a pipeline for a loaded configuration
    pub fn from_config(config: &PodcastConfig) -> Result<Self> {
        Self::new(config.output_dir())
    }

    /// Create a pipeline with a custom feed client
    pub fn with_feed_client(feeds: FeedClient, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            feeds,
            output_dir: output_dir.into(),
        }
    }

    /// Directory episodes are written to
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Process one podcast URL
    ///
    /// # Errors
    /// Propagates network, HTTP, feed parse and I/O errors unchanged.
    pub async fn process_url(&self, source_url: &str) -> Result<EpisodeOutcome> {
        let Some(id) = extract_id(source_url) else {
            warn!("No feed id in {}, skipping", source_url);
            return Ok(EpisodeOutcome::SkippedNoId {
                source_url: source_url.to_string(),
            });
        };

        let feed_url = self.feeds.feed_url(&id);
        info!("Resolved {} to feed {}", source_url, feed_url);

        let Some(enclosure_url) = self.feeds.first_enclosure(&feed_url).await? else {
            warn!("Feed {} has no episode to download, skipping", feed_url);
            return Ok(EpisodeOutcome::SkippedNoEnclosure {
                source_url: source_url.to_string(),
                feed_url,
            });
        };

        let path =
            download_episode(self.feeds.http_client(), &enclosure_url, &self.output_dir).await?;

        Ok(EpisodeOutcome::Saved {
            source_url: source_url.to_string(),
            feed_url,
            enclosure_url,
            path,
        })
    }

    /// Process every URL in order, stopping at the first error
    pub async fn run(&self, urls: &[String]) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for url in urls {
            summary.outcomes.push(self.process_url(url).await?);
        }
        info!(
            "Run finished: {} saved, {} skipped",
            summary.saved(),
            summary.skipped()
        );
        Ok(summary)
    }
}
