// swcrv-core/src/install/package.rs
//! Staging and swapping of a platform package directory.

use std::path::{Path, PathBuf};

use swcrv_aio::checksum::{digests_match, sha256_file};
use swcrv_aio::fs::{
    copy_file, create_dir_all, list_directory_entries, read_to_bytes, remove_directory_recursive,
    rename_path, write_file_synced,
};
use swcrv_common::error::{Result, SwcrvError};
use tracing::{debug, error, warn};

const STAGING_TAG: &str = "swcrv-staging";
const ASIDE_TAG: &str = "swcrv-old";

/// Sibling directory names used while swapping `dir_name`, unique per process.
pub fn staging_path(final_dir: &Path) -> Result<PathBuf> {
    sibling(final_dir, STAGING_TAG)
}

pub fn aside_path(final_dir: &Path) -> Result<PathBuf> {
    sibling(final_dir, ASIDE_TAG)
}

fn sibling(final_dir: &Path, tag: &str) -> Result<PathBuf> {
    let name = dir_name(final_dir)?;
    Ok(final_dir.with_file_name(format!(".{name}.{tag}-{}", std::process::id())))
}

fn dir_name(final_dir: &Path) -> Result<String> {
    final_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| {
            SwcrvError::InstallError(format!("{} has no directory name", final_dir.display()))
        })
}

/// Removes staging and aside directories left behind by an interrupted run.
/// If the final directory is gone but an aside copy survived, the copy is put
/// back first.
pub fn clean_leftovers(final_dir: &Path) -> Result<()> {
    let Some(parent) = final_dir.parent() else {
        return Ok(());
    };
    if !parent.is_dir() {
        return Ok(());
    }
    let name = dir_name(final_dir)?;
    let staging_prefix = format!(".{name}.{STAGING_TAG}-");
    let aside_prefix = format!(".{name}.{ASIDE_TAG}-");

    for (entry_name, path, is_dir) in list_directory_entries(parent)? {
        if !is_dir {
            continue;
        }
        if entry_name.starts_with(&aside_prefix) && !final_dir.exists() {
            warn!(
                "Restoring {} from interrupted install leftover {}",
                final_dir.display(),
                path.display()
            );
            rename_path(&path, final_dir)?;
        } else if entry_name.starts_with(&staging_prefix) || entry_name.starts_with(&aside_prefix) {
            warn!("Removing leftover directory {}", path.display());
            remove_directory_recursive(&path)?;
        }
    }
    Ok(())
}

/// Writes the binary, then the manifest, into a fresh staging directory.
pub fn stage(
    staging: &Path,
    binary_source: &Path,
    binary_file_name: &str,
    manifest: &[u8],
) -> Result<()> {
    if staging.exists() {
        remove_directory_recursive(staging)?;
    }
    create_dir_all(staging)?;
    copy_file(binary_source, &staging.join(binary_file_name))?;
    write_file_synced(&staging.join("package.json"), manifest)?;
    debug!("Staged package in {}", staging.display());
    Ok(())
}

/// Renames `staging` onto `final_dir`. An existing directory is moved aside
/// first and put back if the final rename fails.
pub fn swap_into_place(staging: &Path, final_dir: &Path) -> Result<()> {
    let aside = if final_dir.exists() {
        let aside = aside_path(final_dir)?;
        rename_path(final_dir, &aside)?;
        debug!("Moved previous package aside to {}", aside.display());
        Some(aside)
    } else {
        None
    };

    if let Err(e) = rename_path(staging, final_dir) {
        error!("Could not move {} into place: {}", staging.display(), e);
        if let Some(aside) = &aside {
            if let Err(restore_err) = rename_path(aside, final_dir) {
                return Err(SwcrvError::InstallError(format!(
                    "{e}; restoring the previous package from {} also failed: {restore_err}",
                    aside.display()
                )));
            }
        }
        if let Err(cleanup_err) = remove_directory_recursive(staging) {
            debug!("Could not remove staging directory: {}", cleanup_err);
        }
        return Err(e);
    }

    if let Some(aside) = aside {
        if let Err(e) = remove_directory_recursive(&aside) {
            warn!("Could not remove previous package {}: {}", aside.display(), e);
        }
    }
    Ok(())
}

/// True when `final_dir` holds exactly the binary (by digest) and manifest
/// (by bytes) an install would write.
pub fn is_identical(
    final_dir: &Path,
    binary_file_name: &str,
    binary_digest: &str,
    manifest: &[u8],
) -> Result<bool> {
    if !final_dir.is_dir() {
        return Ok(false);
    }
    let mut names: Vec<String> = list_directory_entries(final_dir)?
        .into_iter()
        .map(|(name, _, _)| name)
        .collect();
    names.sort();
    let mut expected = vec![binary_file_name.to_string(), "package.json".to_string()];
    expected.sort();
    if names != expected {
        return Ok(false);
    }
    if read_to_bytes(&final_dir.join("package.json"))? != manifest {
        return Ok(false);
    }
    Ok(digests_match(
        &sha256_file(&final_dir.join(binary_file_name))?,
        binary_digest,
    ))
}
