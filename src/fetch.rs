//! Download of generated clips from the animation service

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{ExportError, FetchError, Result};

/// Stream `url` into `dest`, returning the number of bytes written
///
/// Non-2xx responses fail without creating `dest`.
pub async fn download_clip(url: &str, dest: &Path) -> Result<u64> {
    info!("Downloading generated clip from: {}", url);

    let response = reqwest::Client::new()
        .get(url)
        .send()
        .await
        .map_err(FetchError::from)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        }.into());
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut downloaded: u64 = 0;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::from)?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
    }
    file.flush().await?;

    debug!("Downloaded {} bytes to {:?}", downloaded, dest);
    Ok(downloaded)
}

/// Download into a new persisted `greeting_src_*.mp4` in `dir` (or the
/// system temp dir). The caller removes the file when done.
pub async fn download_clip_to_temp(url: &str, dir: Option<&Path>) -> Result<PathBuf> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("greeting_src_").suffix(".mp4");
    let file = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    let (_, path) = file
        .keep()
        .map_err(|e| ExportError::OutputFile { reason: e.to_string() })?;

    if let Err(e) = download_clip(url, &path).await {
        tokio::fs::remove_file(&path).await.ok();
        return Err(e);
    }
    Ok(path)
}

/// True for values the CLI should fetch rather than open
pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}
