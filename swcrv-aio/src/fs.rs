/*
File: swcrv-aio/src/fs.rs
Purpose: Primitive synchronous filesystem operations.
*/
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use swcrv_common::error::{Result, SwcrvError};
use tempfile::NamedTempFile;
use tracing::{debug, error, warn};

/// Creates a directory and all its parent components if they are missing.
pub fn create_dir_all(path: &Path) -> Result<()> {
    debug!("Creating directory recursively: {}", path.display());
    fs::create_dir_all(path).map_err(|e| {
        error!("Failed create dir {}: {}", path.display(), e);
        SwcrvError::from(e)
    })
}

/// Removes a file.
pub fn remove_file(path: &Path) -> Result<()> {
    debug!("Removing file: {}", path.display());
    fs::remove_file(path).map_err(|e| {
        if e.kind() != io::ErrorKind::NotFound {
            error!("Failed remove file {}: {}", path.display(), e);
        }
        SwcrvError::from(e)
    })
}

/// Removes a directory and all its contents recursively.
pub fn remove_directory_recursive(path: &Path) -> Result<()> {
    debug!("Removing directory recursively: {}", path.display());
    fs::remove_dir_all(path).map_err(|e| {
        if e.kind() != io::ErrorKind::NotFound {
            error!("Failed remove dir_all {}: {}", path.display(), e);
        }
        SwcrvError::from(e)
    })
}

/// Renames a file or directory. Both paths must be on the same filesystem.
pub fn rename_path(from: &Path, to: &Path) -> Result<()> {
    debug!("Renaming {} -> {}", from.display(), to.display());
    fs::rename(from, to).map_err(|e| {
        error!("Failed rename {} -> {}: {}", from.display(), to.display(), e);
        SwcrvError::from(e)
    })
}

/// Copies a file, returning the number of bytes copied.
pub fn copy_file(from: &Path, to: &Path) -> Result<u64> {
    debug!("Copying {} -> {}", from.display(), to.display());
    fs::copy(from, to).map_err(|e| {
        error!("Failed copy {} -> {}: {}", from.display(), to.display(), e);
        SwcrvError::from(e)
    })
}

/// Reads the entire contents of a file into a byte vector.
pub fn read_to_bytes(path: &Path) -> Result<Vec<u8>> {
    debug!("Reading file to bytes: {}", path.display());
    fs::read(path).map_err(|e| {
        error!("Failed read file {}: {}", path.display(), e);
        SwcrvError::from(e)
    })
}

/// Writes a whole file and flushes it to disk before returning.
pub fn write_file_synced(path: &Path, content: &[u8]) -> Result<()> {
    debug!("Writing {} bytes to {}", content.len(), path.display());
    let mut file = fs::File::create(path)?;
    file.write_all(content)?;
    file.sync_all()?;
    Ok(())
}

/// Sets file permissions (Unix only). Mode is standard Unix octal mode.
#[cfg(unix)]
pub fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    debug!("Setting permissions on {}: {:o}", path.display(), mode);
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| {
        error!("Failed set permissions on {}: {}", path.display(), e);
        SwcrvError::from(e)
    })
}

#[cfg(not(unix))]
pub fn set_permissions(path: &Path, _mode: u32) -> Result<()> {
    warn!(
        "Setting permissions not fully supported on this platform: {}",
        path.display()
    );
    Ok(())
}

/// Atomically writes data to a file using a temporary file in the same directory.
/// Preserves original permissions if possible.
pub fn atomic_write_file(original_path: &Path, content: &[u8]) -> Result<()> {
    let dir = original_path.parent().ok_or_else(|| {
        SwcrvError::IoError(format!(
            "Cannot get parent directory for {}",
            original_path.display()
        ))
    })?;

    create_dir_all(dir)?;

    let original_perms = fs::metadata(original_path).map(|m| m.permissions()).ok();

    let mut temp_file = NamedTempFile::new_in(dir)?;
    let temp_path = temp_file.path().to_path_buf();

    debug!(
        "Atomically writing {} bytes to {} via temp file {}",
        content.len(),
        original_path.display(),
        temp_path.display()
    );

    temp_file.write_all(content)?;
    temp_file.flush()?;
    temp_file.as_file().sync_all()?;

    temp_file.persist(original_path).map_err(|e| {
        error!(
            "Failed to persist/rename temporary file {} over {}: {}",
            temp_path.display(),
            original_path.display(),
            e.error
        );
        SwcrvError::Io(Arc::new(e.error))
    })?;

    if let Some(perms) = original_perms {
        if let Err(e) = fs::set_permissions(original_path, perms) {
            warn!(
                "Failed to restore original permissions on {}: {}",
                original_path.display(),
                e
            );
        }
    } else if cfg!(unix) {
        if let Err(e) = set_permissions(original_path, 0o644) {
            warn!(
                "Failed to set default permissions on new file {}: {}",
                original_path.display(),
                e
            );
        }
    }

    Ok(())
}

/// Lists directory entries, returning basic info.
/// Skips entries that cause errors during reading.
pub fn list_directory_entries(
    dir_path: &Path,
) -> Result<Vec<(String, PathBuf, bool /* is_dir */)>> {
    debug!("Listing directory entries for: {}", dir_path.display());
    let mut entries = Vec::new();
    let read_dir = fs::read_dir(dir_path).map_err(|e| {
        error!("Failed to read directory {}: {}", dir_path.display(), e);
        SwcrvError::from(e)
    })?;

    for entry_res in read_dir {
        let entry = match entry_res {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Error reading entry in {}: {}", dir_path.display(), e);
                continue;
            }
        };
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        match entry.file_type() {
            Ok(file_type) => entries.push((name, path, file_type.is_dir())),
            Err(e) => warn!("Failed to get file type for {}: {}", path.display(), e),
        }
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_replaces_content_and_keeps_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.js");
        fs::write(&path, b"old").unwrap();
        #[cfg(unix)]
        set_permissions(&path, 0o600).unwrap();

        atomic_write_file(&path, b"new").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"new");
        #[cfg(unix)]
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o600);
        // no stray temp files left next to the target
        assert_eq!(list_directory_entries(dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn lists_entries_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("a"), b"").unwrap();
        let entries = list_directory_entries(dir.path()).unwrap();
        assert_eq!(entries[0].0, "a");
        assert!(!entries[0].2);
        assert_eq!(entries[1].0, "b");
        assert!(entries[1].2);
    }
}
