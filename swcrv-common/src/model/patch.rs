// swcrv-common/src/model/patch.rs
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::config::Config;

/// Extension appended to the loader file name for the on-disk snapshot.
pub const BACKUP_EXTENSION: &str = "swcrv-backup";

/// Where the architecture table lives: after `scope`, the object literal
/// assigned to the `table_key` property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLocator {
    pub scope: String,
    pub table_key: String,
}

/// One textual transformation of the host framework's loader file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchTarget {
    pub file_path: PathBuf,
    pub locator: TableLocator,
    pub anchor_key: String,
    pub new_key: String,
    pub new_value: String,
}

impl PatchTarget {
    /// Patch that teaches the loader table for `platform` about `arch`, mapping
    /// it to the triples the framework already ships (`linux.riscv64`).
    pub fn for_project(project_dir: &Path, platform: &str, arch: &str, config: &Config) -> Self {
        Self {
            file_path: config.loader_file_path(project_dir),
            locator: TableLocator {
                scope: config.host.table_scope.clone(),
                table_key: platform.to_string(),
            },
            anchor_key: config.host.anchor_arch.clone(),
            new_key: arch.to_string(),
            new_value: format!("{platform}.{arch}"),
        }
    }

    /// Exact text whose presence proves the patch is applied.
    pub fn idempotency_marker(&self) -> String {
        format!("{}: {}", self.new_key, self.new_value)
    }

    pub fn backup_path(&self) -> PathBuf {
        let mut name = self
            .file_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".");
        name.push(BACKUP_EXTENSION);
        self.file_path.with_file_name(name)
    }
}

/// Snapshot of the target file taken before any mutation.
#[derive(Debug, Clone)]
pub struct Backup {
    pub original_file_path: PathBuf,
    pub snapshot: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub sibling_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_and_backup_path() {
        let config = Config::from_defaults();
        let target = PatchTarget::for_project(Path::new("/app"), "linux", "riscv64", &config);
        assert_eq!(target.idempotency_marker(), "riscv64: linux.riscv64");
        assert_eq!(target.locator.table_key, "linux");
        assert_eq!(target.anchor_key, "arm64");
        assert_eq!(
            target.backup_path(),
            PathBuf::from("/app/node_modules/next/dist/build/swc/index.js.swcrv-backup")
        );
    }
}
