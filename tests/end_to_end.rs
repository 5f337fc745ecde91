//! End-to-end tests: configuration file -> feed lookup -> episode on disk
//!
//! The feed host and the audio CDN are both served by a local wiremock server.

mod common;

use common::{EMPTY_FEED, episode_bytes, feed_with_enclosure, mount_audio, mount_feed};
use podcast_dl::{
    EpisodeOutcome, Error, FeedClient, Pipeline, PodcastConfig, build_feed_url, extract_id,
};
use tempfile::TempDir;
use wiremock::MockServer;

fn write_config(dir: &TempDir, output_dir: &str, urls: &[&str]) -> std::path::PathBuf {
    let mut yaml = format!("downloaded_podcast_audio: \"{}\"\npodcast_url:\n", output_dir);
    for url in urls {
        yaml.push_str(&format!("  - \"{}\"\n", url));
    }
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

fn pipeline(server: &MockServer, config: &PodcastConfig) -> Pipeline {
    Pipeline::with_feed_client(
        FeedClient::with_client(reqwest::Client::new(), server.uri()),
        config.output_dir(),
    )
}

#[test]
fn identifier_and_feed_url_for_sample_page() {
    let id = extract_id("https://ivoox.com/podcast-sample/sq_f123456_1.html").unwrap();
    assert_eq!(id, "f123456");
    assert_eq!(
        build_feed_url(&id),
        "https://feeds.ivoox.com/feed_fg_f123456_filtro_1.xml"
    );
}

#[tokio::test]
async fn config_to_file_on_disk() {
    let server = MockServer::start().await;
    let enclosure = format!("{}/audio/newest.mp3?source=feed", server.uri());
    mount_feed(&server, "f123456", feed_with_enclosure(&enclosure)).await;
    mount_audio(&server, "/audio/newest.mp3", episode_bytes()).await;

    let temp_dir = TempDir::new().unwrap();
    let out_dir = temp_dir.path().join("out");
    let config_path = write_config(
        &temp_dir,
        out_dir.to_str().unwrap(),
        &["https://ivoox.com/podcast-sample/sq_f123456_1.html"],
    );

    let config = PodcastConfig::load(&config_path).unwrap();
    let summary = pipeline(&server, &config)
        .run(&config.podcast_url)
        .await
        .unwrap();

    assert_eq!(summary.saved(), 1);
    let expected_path = out_dir.join("newest.mp3");
    assert_eq!(
        summary.outcomes[0],
        EpisodeOutcome::Saved {
            source_url: "https://ivoox.com/podcast-sample/sq_f123456_1.html".to_string(),
            feed_url: format!("{}/feed_fg_f123456_filtro_1.xml", server.uri()),
            enclosure_url: enclosure.clone(),
            path: expected_path.clone(),
        }
    );
    assert_eq!(std::fs::read(&expected_path).unwrap(), episode_bytes());
}

#[tokio::test]
async fn skips_are_reported_and_run_continues() {
    let server = MockServer::start().await;
    mount_feed(&server, "f1", EMPTY_FEED.to_string()).await;
    let enclosure = format!("{}/ep2.mp3", server.uri());
    mount_feed(&server, "f2", feed_with_enclosure(&enclosure)).await;
    mount_audio(&server, "/ep2.mp3", b"id3 data".to_vec()).await;

    let temp_dir = TempDir::new().unwrap();
    let out_dir = temp_dir.path().join("audio");
    let config_path = write_config(
        &temp_dir,
        out_dir.to_str().unwrap(),
        &[
            "https://www.ivoox.com/no-id-here.html",
            "https://www.ivoox.com/empty_sq_f1_1.html",
            "https://www.ivoox.com/full_sq_f2_1.html",
        ],
    );

    let config = PodcastConfig::load(&config_path).unwrap();
    let summary = pipeline(&server, &config)
        .run(&config.podcast_url)
        .await
        .unwrap();

    assert_eq!(summary.outcomes.len(), 3);
    assert!(matches!(
        summary.outcomes[0],
        EpisodeOutcome::SkippedNoId { .. }
    ));
    assert!(matches!(
        summary.outcomes[1],
        EpisodeOutcome::SkippedNoEnclosure { .. }
    ));
    assert!(summary.outcomes[2].is_saved());
    assert_eq!(summary.skipped(), 2);
    assert_eq!(std::fs::read(out_dir.join("ep2.mp3")).unwrap(), b"id3 data");
}

#[tokio::test]
async fn missing_episode_aborts_the_run() {
    let server = MockServer::start().await;
    let enclosure = format!("{}/gone.mp3", server.uri());
    mount_feed(&server, "f7", feed_with_enclosure(&enclosure)).await;

    let temp_dir = TempDir::new().unwrap();
    let out_dir = temp_dir.path().join("out");
    let config_path = write_config(
        &temp_dir,
        out_dir.to_str().unwrap(),
        &["https://www.ivoox.com/show_sq_f7_1.html"],
    );

    let config = PodcastConfig::load(&config_path).unwrap();
    let err = pipeline(&server, &config)
        .run(&config.podcast_url)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Http { status: 404, .. }));
    assert!(!out_dir.join("gone.mp3").exists());
}
