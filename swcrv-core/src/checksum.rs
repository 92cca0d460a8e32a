// swcrv-core/src/checksum.rs
//! Digest manifest parsing and the gate between fetching and installing.

use std::path::Path;

use swcrv_aio::checksum::{digests_match, sha256_file};
use swcrv_aio::fs::remove_file;
use swcrv_common::error::{Result, SwcrvError};
use swcrv_common::model::Artifact;
use tracing::{debug, warn};

/// One `<hex-digest>  <filename>` line of a digest manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestEntry {
    pub digest: String,
    pub file_name: String,
}

/// Parses a `sha256sum`-style manifest. Blank, comment and malformed lines are
/// skipped; a leading `*` on the file name (binary mode) is accepted.
pub fn parse_digest_manifest(content: &str) -> Vec<DigestEntry> {
    let mut entries = Vec::new();
    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(2, char::is_whitespace);
        let digest = parts.next().unwrap_or_default();
        let file_name = parts
            .next()
            .map(|rest| rest.trim_start().trim_start_matches('*'))
            .unwrap_or_default();

        if !is_sha256_hex(digest) || file_name.is_empty() {
            debug!("Ignoring malformed digest manifest line {}: {:?}", index + 1, raw);
            continue;
        }
        entries.push(DigestEntry {
            digest: digest.to_ascii_lowercase(),
            file_name: file_name.to_string(),
        });
    }
    entries
}

/// Digest the manifest declares for `asset_name`. A published manifest with no
/// line for the asset does not vouch for it.
pub fn declared_digest_for(manifest: &str, asset_name: &str) -> Result<String> {
    parse_digest_manifest(manifest)
        .into_iter()
        .find(|entry| entry.file_name == asset_name)
        .map(|entry| entry.digest)
        .ok_or_else(|| {
            SwcrvError::ChecksumMismatch(format!(
                "digest manifest has no entry for {asset_name}"
            ))
        })
}

pub fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64 && value.chars().all(|c| c.is_ascii_hexdigit())
}

/// An artifact whose bytes were hashed from disk and checked against the
/// declared digest (or explicitly accepted without one). Only this module can
/// construct it.
#[derive(Debug, Clone)]
pub struct VerifiedArtifact {
    artifact: Artifact,
    digest_checked: bool,
}

impl VerifiedArtifact {
    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    pub fn path(&self) -> &Path {
        &self.artifact.path
    }

    /// `false` when no digest was published and the artifact was let through.
    pub fn digest_checked(&self) -> bool {
        self.digest_checked
    }
}

/// Recomputes the artifact's digest and compares it with the declared one.
///
/// On mismatch the temporary artifact is deleted. Without any declared digest
/// the artifact is let through and a warning is pushed onto `warnings`.
pub fn verify_artifact(artifact: Artifact, warnings: &mut Vec<String>) -> Result<VerifiedArtifact> {
    let actual = sha256_file(&artifact.path)?;
    if !digests_match(&actual, &artifact.computed_digest) {
        discard_artifact(&artifact.path);
        return Err(SwcrvError::ChecksumMismatch(format!(
            "{} changed on disk after download (streamed {}, now {})",
            artifact.path.display(),
            artifact.computed_digest,
            actual
        )));
    }

    match artifact.declared_digest.as_deref() {
        Some(expected) if digests_match(&actual, expected) => {
            debug!("Checksum OK for {} ({})", artifact.descriptor.asset_name, actual);
            Ok(VerifiedArtifact {
                artifact,
                digest_checked: true,
            })
        }
        Some(expected) => {
            discard_artifact(&artifact.path);
            Err(SwcrvError::ChecksumMismatch(format!(
                "{}: expected {}, got {}",
                artifact.descriptor.asset_name, expected, actual
            )))
        }
        None => {
            let message = format!(
                "No digest published for {}; installing without checksum verification (sha256 {})",
                artifact.descriptor.asset_name, actual
            );
            warn!("{}", message);
            warnings.push(message);
            Ok(VerifiedArtifact {
                artifact,
                digest_checked: false,
            })
        }
    }
}

fn discard_artifact(path: &Path) {
    if let Err(e) = remove_file(path) {
        debug!("Could not remove rejected artifact {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use swcrv_common::config::Config;
    use swcrv_common::model::release::ReleaseDescriptor;
    use swcrv_common::model::target::{Abi, Target};

    use super::*;

    const HELLO: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
    const ASSET: &str = "next-swc.linux-riscv64-gnu.node";

    fn artifact(dir: &Path, declared: Option<&str>) -> Artifact {
        let path = dir.join(ASSET);
        fs::write(&path, b"hello").unwrap();
        let target = Target::linux("riscv64", Abi::Gnu).unwrap();
        Artifact {
            descriptor: ReleaseDescriptor::resolve("13.5.6", &target, 1, &Config::from_defaults())
                .unwrap(),
            path,
            size: 5,
            declared_digest: declared.map(str::to_string),
            computed_digest: HELLO.to_string(),
        }
    }

    #[test]
    fn parses_manifest_lines() {
        let manifest = format!(
            "# generated\n\n{HELLO}  {ASSET}\n{}  *other.node\nnot-a-digest  broken.node\n",
            HELLO.to_uppercase()
        );
        let entries = parse_digest_manifest(&manifest);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].file_name, ASSET);
        assert_eq!(entries[1].file_name, "other.node");
        assert_eq!(entries[1].digest, HELLO);

        assert_eq!(declared_digest_for(&manifest, ASSET).unwrap(), HELLO);
        let err = declared_digest_for(&manifest, "missing.node").unwrap_err();
        assert_eq!(err.code(), "CHECKSUM_MISMATCH");
    }

    #[test]
    fn matching_digest_passes() {
        let dir = tempfile::tempdir().unwrap();
        let mut warnings = Vec::new();
        let verified =
            verify_artifact(artifact(dir.path(), Some(HELLO.to_uppercase().as_str())), &mut warnings)
                .unwrap();
        assert!(verified.digest_checked());
        assert!(warnings.is_empty());
    }

    #[test]
    fn mismatch_deletes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let bad = "0".repeat(64);
        let mut warnings = Vec::new();
        let err = verify_artifact(artifact(dir.path(), Some(bad.as_str())), &mut warnings).unwrap_err();
        assert_eq!(err.code(), "CHECKSUM_MISMATCH");
        assert!(!dir.path().join(ASSET).exists());
    }

    #[test]
    fn missing_digest_warns_and_proceeds() {
        let dir = tempfile::tempdir().unwrap();
        let mut warnings = Vec::new();
        let verified = verify_artifact(artifact(dir.path(), None), &mut warnings).unwrap();
        assert!(!verified.digest_checked());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("without checksum verification"));
    }
}
