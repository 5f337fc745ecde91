//! Utility functions for naming downloaded episodes

use crate::error::{Error, Result};

/// Marker identifying an audio file in a URL path segment
pub const AUDIO_MARKER: &str = ".mp3";

/// Derive the local filename for a media URL
///
/// Takes the last path segment of the URL. If that segment does not end with
/// [`AUDIO_MARKER`] but contains it, everything after the first occurrence of the
/// marker is dropped, which strips tracking suffixes some hosts glue onto the name.
/// The comparison ignores ASCII case; the returned name keeps the original case.
///
/// # Examples
///
/// ```
/// use podcast_dl::utils::episode_filename;
///
/// let name = episode_filename("https://cdn.example.com/audio/episode.mp3?token=abc").unwrap();
/// assert_eq!(name, "episode.mp3");
/// ```
///
/// # Errors
/// Returns [`Error::InvalidUrl`] if the URL has no non-empty final segment.
pub fn episode_filename(url: &str) -> Result<String> {
    let segment = last_path_segment(url);
    if segment.is_empty() {
        return Err(Error::InvalidUrl {
            url: url.to_string(),
            reason: "URL has no final path segment to name the file after".to_string(),
        });
    }

    Ok(truncate_after_marker(segment).to_string())
}

/// Last path segment, preferring the parsed URL path so that a query string
/// containing slashes cannot leak into the name.
fn last_path_segment(url: &str) -> &str {
    if let Ok(parsed) = url::Url::parse(url)
        && let Some(mut segments) = parsed.path_segments()
        && let Some(last) = segments.next_back()
        && !last.is_empty()
    {
        // Locate the same segment in the input so the borrowed slice keeps the
        // original spelling (no percent re-encoding by the parser).
        let path_end = url.find(['?', '#']).unwrap_or(url.len());
        let path = &url[..path_end];
        if let Some(idx) = path.rfind('/') {
            return &path[idx + 1..];
        }
    }

    url.rsplit('/').next().unwrap_or("")
}

fn truncate_after_marker(segment: &str) -> &str {
    let lower = segment.to_ascii_lowercase();
    if lower.ends_with(AUDIO_MARKER) {
        return segment;
    }
    match lower.find(AUDIO_MARKER) {
        Some(idx) => &segment[..idx + AUDIO_MARKER.len()],
        None => segment,
    }
}
