//! Feed fixtures and mock feed host helpers

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fake MP3 payload, larger than one network chunk
pub fn episode_bytes() -> Vec<u8> {
    (0..200_000u32).map(|i| (i % 251) as u8).collect()
}

/// RSS document whose first item points at `enclosure_url`
pub fn feed_with_enclosure(enclosure_url: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
  <channel>
    <title>Mock Podcast</title>
    <item>
      <title>Newest episode</title>
      <enclosure url="{}" type="audio/mpeg" length="200000"/>
    </item>
    <item>
      <title>Older episode</title>
      <enclosure url="https://cdn.example.com/old.mp3" type="audio/mpeg"/>
    </item>
  </channel>
</rss>"#,
        enclosure_url
    )
}

/// RSS document with a channel but no items
pub const EMPTY_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Nothing yet</title></channel></rss>"#;

/// Serve `body` as the feed of program `id`
pub async fn mount_feed(server: &MockServer, id: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/feed_fg_{}_filtro_1.xml", id)))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/rss+xml")
                .set_body_string(body),
        )
        .expect(1)
        .mount(server)
        .await;
}

/// Serve `bytes` as an audio file at `path_str`
pub async fn mount_audio(server: &MockServer, path_str: &str, bytes: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(path_str))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "audio/mpeg")
                .set_body_bytes(bytes),
        )
        .expect(1)
        .mount(server)
        .await;
}
