// swcrv-net/src/http.rs
use std::path::{Path, PathBuf};

use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use swcrv_common::config::Config;
use swcrv_common::error::{Result, SwcrvError};
use tokio::fs::File as TokioFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};

use crate::validation::validate_url;

const USER_AGENT_STRING: &str = "swcrv (Rust; native binding installer)";

/// A file streamed to disk, hashed on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub size: u64,
    pub sha256: String,
}

#[derive(Debug, Deserialize)]
struct ReleaseInfo {
    tag_name: String,
}

pub fn build_http_client(config: &Config) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    if let Some(token) = &config.github_token {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
            SwcrvError::Config(format!("GitHub token is not a valid header value: {e}"))
        })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    Client::builder()
        .timeout(config.http_timeout)
        .connect_timeout(config.connect_timeout)
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| SwcrvError::Config(format!("Failed to build HTTP client: {e}")))
}

/// Streams `url` into `dest`, computing its SHA-256 on the fly.
///
/// Returns `Ok(None)` when the server answers 404 so callers can turn that into
/// a domain-specific "not found" error. The partial file is removed on any failure.
pub async fn download_to_file(
    client: &Client,
    url: &str,
    dest: &Path,
) -> Result<Option<DownloadedFile>> {
    validate_url(url)?;
    debug!("Downloading {} to {}", url, dest.display());

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| SwcrvError::NetworkError(url.to_string(), e.to_string()))?;
    let status = response.status();
    debug!("Received HTTP status: {} for {}", status, url);

    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        error!("HTTP error {} for URL {}", status, url);
        return Err(SwcrvError::NetworkError(
            url.to_string(),
            format!("HTTP status {status}"),
        ));
    }

    let progress = progress_bar(response.content_length(), dest);
    let result = stream_body(response, url, dest, &progress).await;
    progress.finish_and_clear();

    match result {
        Ok(file) => Ok(Some(file)),
        Err(e) => {
            if let Err(remove_err) = tokio::fs::remove_file(dest).await {
                debug!(
                    "Could not remove partial download {}: {}",
                    dest.display(),
                    remove_err
                );
            }
            Err(e)
        }
    }
}

async fn stream_body(
    response: reqwest::Response,
    url: &str,
    dest: &Path,
    progress: &ProgressBar,
) -> Result<DownloadedFile> {
    let mut file = TokioFile::create(dest).await.map_err(|e| {
        SwcrvError::IoError(format!("Failed to create {}: {}", dest.display(), e))
    })?;
    let mut hasher = Sha256::new();
    let mut size: u64 = 0;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| SwcrvError::NetworkError(url.to_string(), e.to_string()))?;
        hasher.update(&chunk);
        file.write_all(&chunk).await.map_err(|e| {
            SwcrvError::IoError(format!("Failed to write to {}: {}", dest.display(), e))
        })?;
        size += chunk.len() as u64;
        progress.set_position(size);
    }
    file.flush().await?;
    file.sync_all().await?;

    let sha256 = hex::encode(hasher.finalize());
    debug!("Downloaded {} bytes from {} (sha256 {})", size, url, sha256);
    Ok(DownloadedFile {
        path: dest.to_path_buf(),
        size,
        sha256,
    })
}

fn progress_bar(total: Option<u64>, dest: &Path) -> ProgressBar {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    match total {
        Some(len) => {
            let bar = ProgressBar::new(len);
            if let Ok(style) = ProgressStyle::with_template(
                "{msg} [{bar:30}] {bytes}/{total_bytes} ({eta})",
            ) {
                bar.set_style(style.progress_chars("=> "));
            }
            bar.set_message(name);
            bar
        }
        None => {
            let spinner = ProgressBar::new_spinner();
            spinner.set_message(name);
            spinner
        }
    }
}

/// GETs a small text document. `Ok(None)` on 404.
pub async fn fetch_optional_text(client: &Client, url: &str) -> Result<Option<String>> {
    validate_url(url)?;
    debug!("Fetching text from {}", url);
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| SwcrvError::NetworkError(url.to_string(), e.to_string()))?;
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        debug!("{} answered 404", url);
        return Ok(None);
    }
    if !status.is_success() {
        return Err(SwcrvError::NetworkError(
            url.to_string(),
            format!("HTTP status {status}"),
        ));
    }
    let text = response
        .text()
        .await
        .map_err(|e| SwcrvError::NetworkError(url.to_string(), e.to_string()))?;
    Ok(Some(text))
}

/// Lists release tag names from a GitHub-compatible releases endpoint.
pub async fn fetch_release_tags(client: &Client, api_url: &str) -> Result<Vec<String>> {
    validate_url(api_url)?;
    debug!("Listing release tags from {}", api_url);
    let response = client
        .get(api_url)
        .header(ACCEPT, "application/vnd.github+json")
        .send()
        .await
        .map_err(|e| SwcrvError::NetworkError(api_url.to_string(), e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        warn!("Listing releases failed with HTTP status {}", status);
        return Err(SwcrvError::NetworkError(
            api_url.to_string(),
            format!("HTTP status {status}"),
        ));
    }
    let releases: Vec<ReleaseInfo> = response
        .json()
        .await
        .map_err(|e| SwcrvError::NetworkError(api_url.to_string(), e.to_string()))?;
    Ok(releases.into_iter().map(|r| r.tag_name).collect())
}
