//! Streaming episode download

use crate::error::{Error, Result};
use crate::utils::episode_filename;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Download a media file into `dest_dir` and return the path written
///
/// The destination directory is created if missing. The filename is derived with
/// [`episode_filename`]; an existing file with the same name is overwritten. The body is
/// streamed to disk chunk by chunk and never held in memory as a whole.
///
/// A transfer that fails midway leaves the partial file in place.
///
/// # Errors
/// - [`Error::InvalidUrl`] if no filename can be derived
/// - [`Error::Network`] if the request fails or the stream breaks
/// - [`Error::Http`] on a non-success status (no file is created)
/// - [`Error::Io`] if the directory or file cannot be written
pub async fn download_episode(
    client: &reqwest::Client,
    url: &str,
    dest_dir: &Path,
) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dest_dir).await?;

    let filename = episode_filename(url)?;
    let dest_path = dest_dir.join(&filename);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| Error::Network {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Http {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    debug!(
        "Downloading {} to {} ({} bytes announced)",
        url,
        dest_path.display(),
        response
            .content_length()
            .map_or_else(|| "unknown".to_string(), |len| len.to_string())
    );

    let mut file = tokio::fs::File::create(&dest_path).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| Error::Network {
            url: url.to_string(),
            source,
        })?;
        // Keep-alive chunks carry no data
        if chunk.is_empty() {
            continue;
        }
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;

    info!("Saved {} ({} bytes)", dest_path.display(), written);
    Ok(dest_path)
}
