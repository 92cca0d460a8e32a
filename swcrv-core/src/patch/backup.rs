// swcrv-core/src/patch/backup.rs
use std::io;

use chrono::Utc;
use swcrv_aio::fs::{atomic_write_file, read_to_bytes, remove_file};
use swcrv_common::error::{Result, SwcrvError};
use swcrv_common::model::{Backup, PatchTarget};
use tracing::{debug, warn};

/// Snapshots the target into memory and into a sibling file before any mutation.
pub fn take_backup(target: &PatchTarget, snapshot: Vec<u8>) -> Result<Backup> {
    let sibling_path = target.backup_path();
    atomic_write_file(&sibling_path, &snapshot)?;
    let backup = Backup {
        original_file_path: target.file_path.clone(),
        snapshot,
        created_at: Utc::now(),
        sibling_path,
    };
    debug!(
        "Backup of {} taken at {} ({} bytes, copy at {})",
        backup.original_file_path.display(),
        backup.created_at.to_rfc3339(),
        backup.snapshot.len(),
        backup.sibling_path.display()
    );
    Ok(backup)
}

/// Puts the snapshot back onto the original path and checks it landed
/// byte-for-byte, then drops the sibling copy.
pub fn restore(backup: &Backup) -> Result<()> {
    warn!(
        "Restoring {} from backup taken at {}",
        backup.original_file_path.display(),
        backup.created_at.to_rfc3339()
    );
    atomic_write_file(&backup.original_file_path, &backup.snapshot)?;
    let current = read_to_bytes(&backup.original_file_path)?;
    if current != backup.snapshot {
        return Err(SwcrvError::IoError(format!(
            "{} differs from its backup after restore",
            backup.original_file_path.display()
        )));
    }
    discard(backup)
}

pub fn discard(backup: &Backup) -> Result<()> {
    match remove_file(&backup.sibling_path) {
        Ok(()) => Ok(()),
        Err(SwcrvError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Deals with a sibling backup left by an interrupted earlier run.
///
/// The target is only ever replaced atomically, so it is either fully original
/// or fully patched and the stale copy can be dropped. Only a missing target is
/// recreated from it.
pub fn recover_stale(target: &PatchTarget) -> Result<()> {
    let sibling = target.backup_path();
    if !sibling.is_file() {
        return Ok(());
    }
    if !target.file_path.exists() {
        warn!(
            "{} is missing but a backup exists; restoring it from {}",
            target.file_path.display(),
            sibling.display()
        );
        let snapshot = read_to_bytes(&sibling)?;
        atomic_write_file(&target.file_path, &snapshot)?;
    } else {
        warn!("Discarding stale backup {}", sibling.display());
    }
    remove_file(&sibling)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use swcrv_common::model::TableLocator;

    use super::*;

    fn target(dir: &std::path::Path) -> PatchTarget {
        PatchTarget {
            file_path: dir.join("index.js"),
            locator: TableLocator {
                scope: "s".into(),
                table_key: "linux".into(),
            },
            anchor_key: "arm64".into(),
            new_key: "riscv64".into(),
            new_value: "linux.riscv64".into(),
        }
    }

    #[test]
    fn restore_puts_snapshot_back_and_drops_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let target = target(dir.path());
        fs::write(&target.file_path, b"original").unwrap();

        let backup = take_backup(&target, b"original".to_vec()).unwrap();
        assert!(target.backup_path().is_file());

        fs::write(&target.file_path, b"half-patched").unwrap();
        restore(&backup).unwrap();

        assert_eq!(fs::read(&target.file_path).unwrap(), b"original");
        assert!(!target.backup_path().exists());
    }

    #[test]
    fn stale_backup_is_dropped_or_used_for_missing_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = target(dir.path());

        fs::write(target.backup_path(), b"snapshot").unwrap();
        recover_stale(&target).unwrap();
        assert_eq!(fs::read(&target.file_path).unwrap(), b"snapshot");
        assert!(!target.backup_path().exists());

        fs::write(&target.file_path, b"current").unwrap();
        fs::write(target.backup_path(), b"older").unwrap();
        recover_stale(&target).unwrap();
        assert_eq!(fs::read(&target.file_path).unwrap(), b"current");
        assert!(!target.backup_path().exists());
    }
}
