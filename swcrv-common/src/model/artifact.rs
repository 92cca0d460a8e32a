// swcrv-common/src/model/artifact.rs
use std::path::PathBuf;

use crate::model::release::ReleaseDescriptor;

/// A fetched binary sitting in a pipeline-owned temporary location.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub descriptor: ReleaseDescriptor,
    pub path: PathBuf,
    pub size: u64,
    /// Digest published for this asset, if any was published.
    pub declared_digest: Option<String>,
    /// Lowercase hex SHA-256 over the fetched bytes.
    pub computed_digest: String,
}
