use clap::Parser;
use podcast_dl::feed::{DEFAULT_FEED_BASE, http_client};
use podcast_dl::{EpisodeOutcome, FeedClient, Pipeline, PodcastConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Download the newest episode of each configured iVoox podcast
#[derive(Debug, Parser)]
#[command(name = "podcast-dl", version, about)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Feed host, for mirrors and local testing
    #[arg(long, default_value = DEFAULT_FEED_BASE, hide = true)]
    feed_base: String,
}

fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> podcast_dl::Result<()> {
    let config = PodcastConfig::load(&cli.config)?;

    println!("{}", config.output_dir().display());
    println!("{:?}", config.podcast_url);

    let feeds = FeedClient::with_client(http_client()?, cli.feed_base);
    let pipeline = Pipeline::with_feed_client(feeds, config.output_dir());

    for url in &config.podcast_url {
        match pipeline.process_url(url).await? {
            EpisodeOutcome::Saved {
                feed_url,
                enclosure_url,
                path,
                ..
            } => {
                println!("{}", feed_url);
                println!("First MP3 URL: {}", enclosure_url);
                println!("Saved: {}", path.display());
            }
            EpisodeOutcome::SkippedNoId { source_url } => {
                println!("ID not found: {}", source_url);
            }
            EpisodeOutcome::SkippedNoEnclosure { feed_url, .. } => {
                println!("{}", feed_url);
                println!("No MP3 found in feed");
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    if let Err(err) = run(Cli::parse()).await {
        eprintln!("podcast-dl error: {}", err);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
