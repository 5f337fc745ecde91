//! Outcome types reported by the download pipeline

use std::path::PathBuf;

/// What happened to one configured podcast URL
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EpisodeOutcome {
    /// The newest episode was written to disk
    Saved {
        /// Podcast page URL from the configuration
        source_url: String,
        /// Feed the episode was found in
        feed_url: String,
        /// Media URL of the first enclosure
        enclosure_url: String,
        /// File written
        path: PathBuf,
    },

    /// The URL carries no feed identifier
    SkippedNoId {
        /// Podcast page URL from the configuration
        source_url: String,
    },

    /// The feed has no channel, item or enclosure to download
    SkippedNoEnclosure {
        /// Podcast page URL from the configuration
        source_url: String,
        /// Feed that was inspected
        feed_url: String,
    },
}

impl EpisodeOutcome {
    /// The configured URL this outcome belongs to
    pub fn source_url(&self) -> &str {
        match self {
            EpisodeOutcome::Saved { source_url, .. }
            | EpisodeOutcome::SkippedNoId { source_url }
            | EpisodeOutcome::SkippedNoEnclosure { source_url, .. } => source_url,
        }
    }

    /// Whether a file was written
    pub fn is_saved(&self) -> bool {
        matches!(self, EpisodeOutcome::Saved { .. })
    }
}

/// Outcomes of a whole run, in configuration order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// One entry per processed URL
    pub outcomes: Vec<EpisodeOutcome>,
}

impl RunSummary {
    /// Number of episodes written
    pub fn saved(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_saved()).count()
    }

    /// Number of URLs skipped
    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.saved()
    }
}
