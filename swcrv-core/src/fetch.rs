// swcrv-core/src/fetch.rs
//! Release fetcher: brings one artifact into a pipeline-owned directory.

use std::path::{Path, PathBuf};

use reqwest::Client;
use swcrv_aio::checksum::sha256_file;
use swcrv_aio::fs::copy_file;
use swcrv_common::config::Config;
use swcrv_common::error::{Result, SwcrvError};
use swcrv_common::model::release::ReleaseDescriptor;
use swcrv_common::model::Artifact;
use swcrv_net::http::{download_to_file, fetch_optional_text, fetch_release_tags};
use tempfile::TempDir;
use tracing::{debug, info, instrument, warn};

use crate::checksum::{declared_digest_for, is_sha256_hex};

/// Where the artifact bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// The release's download URL.
    Release,
    /// A file already on disk, e.g. from a local `build`.
    Local(PathBuf),
}

/// Creates the temporary directory a run downloads into. Dropping it removes
/// everything fetched.
pub fn create_workdir(config: &Config) -> Result<TempDir> {
    std::fs::create_dir_all(&config.tmp_root)?;
    tempfile::Builder::new()
        .prefix("swcrv-fetch-")
        .tempdir_in(&config.tmp_root)
        .map_err(|e| {
            SwcrvError::IoError(format!(
                "Failed to create a temporary directory in {}: {}",
                config.tmp_root.display(),
                e
            ))
        })
}

pub struct ReleaseFetcher<'a> {
    client: &'a Client,
    config: &'a Config,
}

impl<'a> ReleaseFetcher<'a> {
    pub fn new(client: &'a Client, config: &'a Config) -> Self {
        Self { client, config }
    }

    /// Fetches the artifact into `workdir` and resolves its declared digest.
    ///
    /// `digest_override` replaces the published digest manifest entirely.
    #[instrument(
        skip(self, descriptor, source, digest_override, workdir),
        fields(asset = %descriptor.asset_name)
    )]
    pub async fn fetch(
        &self,
        descriptor: &ReleaseDescriptor,
        source: &ArtifactSource,
        digest_override: Option<&str>,
        workdir: &Path,
    ) -> Result<Artifact> {
        if let Some(digest) = digest_override {
            if !is_sha256_hex(digest.trim()) {
                return Err(SwcrvError::ValidationError(format!(
                    "'{digest}' is not a 64 character hex SHA-256 digest"
                )));
            }
        }

        let dest = workdir.join(&descriptor.asset_name);
        let (size, computed_digest) = match source {
            ArtifactSource::Release => self.download(descriptor, &dest).await?,
            ArtifactSource::Local(path) => copy_local(path, &dest)?,
        };

        let declared_digest = match (digest_override, source) {
            (Some(digest), _) => Some(digest.trim().to_ascii_lowercase()),
            (None, ArtifactSource::Release) => self.declared_digest(descriptor).await?,
            (None, ArtifactSource::Local(_)) => {
                debug!("Local artifact without --sha256; no digest to compare against");
                None
            }
        };

        Ok(Artifact {
            descriptor: descriptor.clone(),
            path: dest,
            size,
            declared_digest,
            computed_digest,
        })
    }

    async fn download(&self, descriptor: &ReleaseDescriptor, dest: &Path) -> Result<(u64, String)> {
        info!("Downloading {}", descriptor.download_url);
        match download_to_file(self.client, &descriptor.download_url, dest).await? {
            Some(file) => Ok((file.size, file.sha256)),
            None => Err(SwcrvError::ReleaseNotFound {
                tag: descriptor.tag.clone(),
                asset: descriptor.asset_name.clone(),
                available: self.available_tags().await,
            }),
        }
    }

    async fn declared_digest(&self, descriptor: &ReleaseDescriptor) -> Result<Option<String>> {
        match fetch_optional_text(self.client, &descriptor.digest_url).await? {
            Some(manifest) => declared_digest_for(&manifest, &descriptor.asset_name).map(Some),
            None => {
                debug!("No digest manifest at {}", descriptor.digest_url);
                Ok(None)
            }
        }
    }

    async fn available_tags(&self) -> String {
        match fetch_release_tags(self.client, &self.config.releases_api_url()).await {
            Ok(tags) if tags.is_empty() => "none".to_string(),
            Ok(tags) => tags.join(", "),
            Err(e) => {
                warn!("Could not list available releases: {}", e);
                "unknown".to_string()
            }
        }
    }
}

fn copy_local(source: &Path, dest: &Path) -> Result<(u64, String)> {
    if !source.is_file() {
        return Err(SwcrvError::TargetNotFound(format!(
            "artifact {} does not exist",
            source.display()
        )));
    }
    info!("Using local artifact {}", source.display());
    let size = copy_file(source, dest)?;
    Ok((size, sha256_file(dest)?))
}
