// swcrv-core/src/build.rs
//! Cross-compiles the binding crate and lays the result out like a release.

use std::path::{Path, PathBuf};

use swcrv_aio::checksum::sha256_file;
use swcrv_aio::fs::{atomic_write_file, copy_file, create_dir_all, list_directory_entries};
use swcrv_aio::process::run_command_streaming;
use swcrv_common::error::{Result, SwcrvError};
use swcrv_common::model::release::{ReleaseDescriptor, DIGEST_MANIFEST_NAME};
use tracing::{debug, info, instrument};

use crate::checksum::parse_digest_manifest;

#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub descriptor: ReleaseDescriptor,
    /// Crate (or workspace) that produces the `cdylib`.
    pub source_dir: PathBuf,
    pub out_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    pub binary_path: PathBuf,
    pub digest_manifest_path: PathBuf,
    pub sha256: String,
}

#[instrument(skip(request), fields(asset = %request.descriptor.asset_name))]
pub async fn build_binding(request: &BuildRequest) -> Result<BuildOutput> {
    let triple = request.descriptor.target.rust_triple()?;
    if !request.source_dir.is_dir() {
        return Err(SwcrvError::BuildError(format!(
            "source directory {} does not exist",
            request.source_dir.display()
        )));
    }
    let cargo = which::which("cargo").map_err(|_| {
        SwcrvError::BuildError("cargo command not found in PATH.".to_string())
    })?;

    info!("Building {} for {}", request.descriptor.asset_name, triple);
    let args = vec![
        "build".to_string(),
        "--release".to_string(),
        "--target".to_string(),
        triple.clone(),
    ];
    let status = run_command_streaming(
        cargo.display().to_string(),
        args,
        Some(request.source_dir.clone()),
    )
    .await?;
    if !status.success() {
        return Err(SwcrvError::BuildError(format!(
            "cargo build --target {triple} exited with {status}"
        )));
    }
    debug!("Cargo build completed successfully.");

    let target_dir = std::env::var_os("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| request.source_dir.join("target"));
    let library = locate_library(&target_dir.join(&triple).join("release"))?;
    package_library(&library, &request.out_dir, &request.descriptor.asset_name)
}

/// The single shared library cargo left in `release_dir`.
pub fn locate_library(release_dir: &Path) -> Result<PathBuf> {
    let mut libraries: Vec<PathBuf> = list_directory_entries(release_dir)
        .map_err(|e| SwcrvError::BuildError(format!("no build output: {e}")))?
        .into_iter()
        .filter(|(name, _, is_dir)| {
            !is_dir
                && name.starts_with("lib")
                && (name.ends_with(".so") || name.ends_with(".dylib"))
        })
        .map(|(_, path, _)| path)
        .collect();
    match libraries.len() {
        1 => Ok(libraries.remove(0)),
        0 => Err(SwcrvError::BuildError(format!(
            "no shared library found in {}; is the crate a cdylib?",
            release_dir.display()
        ))),
        _ => Err(SwcrvError::BuildError(format!(
            "several shared libraries in {}: {}",
            release_dir.display(),
            libraries
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

/// Copies the library to `{out_dir}/{asset_name}` and records its digest in
/// the digest manifest, replacing an older line for the same asset.
pub fn package_library(library: &Path, out_dir: &Path, asset_name: &str) -> Result<BuildOutput> {
    create_dir_all(out_dir)?;
    let binary_path = out_dir.join(asset_name);
    copy_file(library, &binary_path)?;
    let sha256 = sha256_file(&binary_path)?;

    let digest_manifest_path = out_dir.join(DIGEST_MANIFEST_NAME);
    let existing = match std::fs::read_to_string(&digest_manifest_path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    let mut content = String::new();
    for entry in parse_digest_manifest(&existing) {
        if entry.file_name != asset_name {
            content.push_str(&format!("{}  {}\n", entry.digest, entry.file_name));
        }
    }
    content.push_str(&format!("{sha256}  {asset_name}\n"));
    atomic_write_file(&digest_manifest_path, content.as_bytes())?;

    info!("Wrote {} (sha256 {})", binary_path.display(), sha256);
    Ok(BuildOutput {
        binary_path,
        digest_manifest_path,
        sha256,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::checksum::declared_digest_for;

    const HELLO: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
    const ASSET: &str = "next-swc.linux-riscv64-gnu.node";

    #[test]
    fn finds_the_single_cdylib() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("libnext_swc_napi.so"), b"").unwrap();
        fs::write(dir.path().join("libnext_swc_napi.d"), b"").unwrap();
        fs::create_dir(dir.path().join("deps")).unwrap();
        assert_eq!(
            locate_library(dir.path()).unwrap(),
            dir.path().join("libnext_swc_napi.so")
        );

        fs::write(dir.path().join("libother.so"), b"").unwrap();
        assert_eq!(locate_library(dir.path()).unwrap_err().code(), "BUILD_ERROR");
    }

    #[test]
    fn packages_library_with_digest_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let library = dir.path().join("libnext_swc_napi.so");
        fs::write(&library, b"hello").unwrap();
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(
            out.join(DIGEST_MANIFEST_NAME),
            format!("{}  {ASSET}\n{HELLO}  other.node\n", "0".repeat(64)),
        )
        .unwrap();

        let output = package_library(&library, &out, ASSET).unwrap();

        assert_eq!(output.sha256, HELLO);
        assert_eq!(fs::read(out.join(ASSET)).unwrap(), b"hello");
        let manifest = fs::read_to_string(&output.digest_manifest_path).unwrap();
        assert_eq!(declared_digest_for(&manifest, ASSET).unwrap(), HELLO);
        assert_eq!(declared_digest_for(&manifest, "other.node").unwrap(), HELLO);
        assert_eq!(manifest.lines().count(), 2);
    }

    #[test]
    fn first_build_creates_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let library = dir.path().join("libnext_swc_napi.so");
        fs::write(&library, b"hello").unwrap();
        let out = dir.path().join("out");

        let output = package_library(&library, &out, ASSET).unwrap();
        let manifest = fs::read_to_string(&output.digest_manifest_path).unwrap();
        assert_eq!(manifest, format!("{HELLO}  {ASSET}\n"));
    }

    #[test]
    fn unreadable_manifest_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let library = dir.path().join("libnext_swc_napi.so");
        fs::write(&library, b"hello").unwrap();
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        let garbled = b"\xff\xfe not utf-8\n".to_vec();
        fs::write(out.join(DIGEST_MANIFEST_NAME), &garbled).unwrap();

        assert!(package_library(&library, &out, ASSET).is_err());
        assert_eq!(fs::read(out.join(DIGEST_MANIFEST_NAME)).unwrap(), garbled);
    }
}
