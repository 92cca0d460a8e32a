// swcrv-core/src/patch/mod.rs
//! Loader patcher: teaches the host framework's architecture table a new key.
//!
//! Every invocation walks the same state machine:
//!
//! ```text
//! NotStarted -> CheckIdempotent -> AlreadyApplied
//!                               -> NeedsPatch -> BackupTaken -> Mutated -> VerifyOk
//!                                                                       -> VerifyFailed -> RolledBack
//! ```
//!
//! Only the target file is ever mutated, always through an atomic replace, and
//! a failure after the backup was taken restores the file byte-for-byte.

pub mod backup;
pub mod table;

use std::fmt;
use std::path::Path;

use swcrv_aio::fs::{atomic_write_file, read_to_bytes};
use swcrv_common::error::{Result, SwcrvError};
use swcrv_common::model::{Backup, PatchTarget};
use tracing::{debug, info, instrument, warn};

use self::table::{insert_after, locate, remove_entry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The entry was inserted and verified.
    Applied,
    /// The marker (or a native entry for the key) was already present.
    AlreadyApplied,
    /// The inserted entry was removed and the removal verified.
    Reverted,
    /// There was nothing to remove.
    NotApplied,
}

impl fmt::Display for PatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PatchOutcome::Applied => "applied",
            PatchOutcome::AlreadyApplied => "already applied",
            PatchOutcome::Reverted => "reverted",
            PatchOutcome::NotApplied => "not applied",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Insert,
    Remove,
}

enum PatchState {
    NotStarted,
    CheckIdempotent { original: Vec<u8> },
    NeedsPatch { original: Vec<u8> },
    BackupTaken { backup: Backup },
    Mutated { backup: Backup },
    VerifyFailed { backup: Backup, error: SwcrvError },
    Done(Result<PatchOutcome>),
}

impl PatchState {
    fn name(&self) -> &'static str {
        match self {
            PatchState::NotStarted => "NotStarted",
            PatchState::CheckIdempotent { .. } => "CheckIdempotent",
            PatchState::NeedsPatch { .. } => "NeedsPatch",
            PatchState::BackupTaken { .. } => "BackupTaken",
            PatchState::Mutated { .. } => "Mutated",
            PatchState::VerifyFailed { .. } => "VerifyFailed",
            PatchState::Done(Ok(_)) => "Done",
            PatchState::Done(Err(_)) => "Failed",
        }
    }
}

type WriteFn = fn(&Path, &[u8]) -> Result<()>;

pub struct LoaderPatcher {
    target: PatchTarget,
    write: WriteFn,
}

impl LoaderPatcher {
    pub fn new(target: PatchTarget) -> Self {
        Self {
            target,
            write: atomic_write_file,
        }
    }

    #[cfg(test)]
    fn with_writer(target: PatchTarget, write: WriteFn) -> Self {
        Self { target, write }
    }

    /// Inserts the new entry below the anchor entry.
    #[instrument(skip(self), fields(file = %self.target.file_path.display()))]
    pub fn apply(&self) -> Result<PatchOutcome> {
        self.run(Edit::Insert)
    }

    /// Removes a previously inserted entry.
    #[instrument(skip(self), fields(file = %self.target.file_path.display()))]
    pub fn revert(&self) -> Result<PatchOutcome> {
        self.run(Edit::Remove)
    }

    fn run(&self, edit: Edit) -> Result<PatchOutcome> {
        let mut state = PatchState::NotStarted;
        loop {
            state = match state {
                PatchState::Done(result) => return result,
                other => {
                    let next = self.step(edit, other);
                    debug!("Loader patch state -> {}", next.name());
                    next
                }
            };
        }
    }

    fn step(&self, edit: Edit, state: PatchState) -> PatchState {
        let path = &self.target.file_path;
        match state {
            PatchState::NotStarted => {
                if let Err(e) = backup::recover_stale(&self.target) {
                    return PatchState::Done(Err(e));
                }
                if !path.is_file() {
                    return PatchState::Done(Err(SwcrvError::TargetNotFound(format!(
                        "{} does not exist; is the host framework installed?",
                        path.display()
                    ))));
                }
                match read_to_bytes(path) {
                    Ok(original) => PatchState::CheckIdempotent { original },
                    Err(e) => PatchState::Done(Err(e)),
                }
            }
            PatchState::CheckIdempotent { original } => match self.check(edit, &original) {
                Ok(Some(outcome)) => PatchState::Done(Ok(outcome)),
                Ok(None) => PatchState::NeedsPatch { original },
                Err(e) => PatchState::Done(Err(e)),
            },
            PatchState::NeedsPatch { original } => {
                match backup::take_backup(&self.target, original) {
                    Ok(backup) => PatchState::BackupTaken { backup },
                    Err(e) => PatchState::Done(Err(e)),
                }
            }
            PatchState::BackupTaken { backup } => {
                let written = self
                    .transform(edit, &backup.snapshot)
                    .and_then(|patched| (self.write)(path, patched.as_bytes()));
                match written {
                    Ok(()) => PatchState::Mutated { backup },
                    Err(error) => PatchState::VerifyFailed { backup, error },
                }
            }
            PatchState::Mutated { backup } => match self.verify(edit) {
                Ok(()) => {
                    if let Err(e) = backup::discard(&backup) {
                        warn!("Could not remove backup {}: {}", backup.sibling_path.display(), e);
                    }
                    PatchState::Done(Ok(match edit {
                        Edit::Insert => PatchOutcome::Applied,
                        Edit::Remove => PatchOutcome::Reverted,
                    }))
                }
                Err(error) => PatchState::VerifyFailed { backup, error },
            },
            PatchState::VerifyFailed { backup, error } => match backup::restore(&backup) {
                Ok(()) => {
                    warn!("Loader patch state -> RolledBack ({})", error);
                    PatchState::Done(Err(error))
                }
                Err(restore_err) => PatchState::Done(Err(SwcrvError::RollbackFailed {
                    path: path.display().to_string(),
                    reason: format!("{restore_err} (after: {error})"),
                    backup: backup.sibling_path.display().to_string(),
                })),
            },
            done @ PatchState::Done(_) => done,
        }
    }

    /// `Some(outcome)` when there is nothing to do.
    fn check(&self, edit: Edit, original: &[u8]) -> Result<Option<PatchOutcome>> {
        let text = self.as_text(original)?;
        let marker = self.target.idempotency_marker();
        match edit {
            Edit::Insert => {
                if text.contains(&marker) {
                    info!("Marker '{}' already present", marker);
                    return Ok(Some(PatchOutcome::AlreadyApplied));
                }
                if let Ok(table) = locate(text, &self.target.locator) {
                    if let Some(entry) = table.entry(&self.target.new_key) {
                        info!(
                            "Table already enumerates '{}' natively ({}); leaving it alone",
                            entry.key, entry.value
                        );
                        return Ok(Some(PatchOutcome::AlreadyApplied));
                    }
                }
                Ok(None)
            }
            Edit::Remove => {
                let present = match locate(text, &self.target.locator) {
                    Ok(table) => table
                        .entries
                        .iter()
                        .any(|e| e.key == self.target.new_key && e.value == self.target.new_value),
                    Err(e) if text.contains(&marker) => {
                        return Err(SwcrvError::PatchApplyFailure(
                            self.target.file_path.display().to_string(),
                            e.to_string(),
                        ))
                    }
                    Err(_) => false,
                };
                Ok((!present).then_some(PatchOutcome::NotApplied))
            }
        }
    }

    fn transform(&self, edit: Edit, snapshot: &[u8]) -> Result<String> {
        let text = self.as_text(snapshot)?;
        let target = &self.target;
        let apply_err = |e: table::TableError| {
            SwcrvError::PatchApplyFailure(target.file_path.display().to_string(), e.to_string())
        };
        let table = locate(text, &target.locator).map_err(apply_err)?;
        let edited = match edit {
            Edit::Insert => insert_after(
                text,
                &table,
                &target.anchor_key,
                &target.new_key,
                &target.new_value,
            ),
            Edit::Remove => remove_entry(text, &table, &target.new_key, &target.new_value),
        };
        edited.map_err(apply_err)
    }

    /// Re-reads the file from disk and checks the edit is structurally there.
    fn verify(&self, edit: Edit) -> Result<()> {
        let target = &self.target;
        let verify_err = |reason: String| {
            SwcrvError::PatchVerifyFailure(target.file_path.display().to_string(), reason)
        };
        let bytes = read_to_bytes(&target.file_path)?;
        let text = self.as_text(&bytes)?;
        let table = locate(text, &target.locator).map_err(|e| verify_err(e.to_string()))?;
        let has_entry = table
            .entries
            .iter()
            .any(|e| e.key == target.new_key && e.value == target.new_value);
        let marker = target.idempotency_marker();

        match edit {
            Edit::Insert if !text.contains(&marker) => {
                Err(verify_err(format!("marker '{marker}' missing after write")))
            }
            Edit::Insert if !has_entry => Err(verify_err(format!(
                "table does not contain '{marker}' after write (keys: {})",
                table.keys().join(", ")
            ))),
            Edit::Remove if has_entry => {
                Err(verify_err(format!("'{marker}' still present after removal")))
            }
            _ => Ok(()),
        }
    }

    fn as_text<'a>(&self, bytes: &'a [u8]) -> Result<&'a str> {
        std::str::from_utf8(bytes).map_err(|e| {
            SwcrvError::PatchApplyFailure(
                self.target.file_path.display().to_string(),
                format!("file is not valid UTF-8: {e}"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use swcrv_common::config::Config;

    use super::*;

    const LOADER: &str = include_str!("../../tests/fixtures/next_swc_index.js");

    fn project_with_loader(content: &str) -> (tempfile::TempDir, PatchTarget) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_defaults();
        let target = PatchTarget::for_project(dir.path(), "linux", "riscv64", &config);
        fs::create_dir_all(target.file_path.parent().unwrap()).unwrap();
        fs::write(&target.file_path, content).unwrap();
        (dir, target)
    }

    fn sibling_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn applies_once_then_reports_already_applied() {
        let (_dir, target) = project_with_loader(LOADER);
        let patcher = LoaderPatcher::new(target.clone());

        assert_eq!(patcher.apply().unwrap(), PatchOutcome::Applied);
        let once = fs::read(&target.file_path).unwrap();
        let text = String::from_utf8(once.clone()).unwrap();
        assert!(text.contains("            arm64: linux.arm64,\n            riscv64: linux.riscv64,\n"));

        assert_eq!(patcher.apply().unwrap(), PatchOutcome::AlreadyApplied);
        assert_eq!(fs::read(&target.file_path).unwrap(), once);
        assert_eq!(
            sibling_files(target.file_path.parent().unwrap()),
            vec!["index.js"]
        );
    }

    #[test]
    fn missing_anchor_rolls_back_to_identical_bytes() {
        let content = LOADER.replace("            arm64: linux.arm64,\n", "");
        let (_dir, target) = project_with_loader(&content);
        let patcher = LoaderPatcher::new(target.clone());

        let err = patcher.apply().unwrap_err();
        assert_eq!(err.code(), "PATCH_APPLY_FAILURE");
        assert_eq!(fs::read_to_string(&target.file_path).unwrap(), content);
        assert!(!target.backup_path().exists());
    }

    fn write_dropping_new_entry(path: &Path, content: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(content)
            .replace("            riscv64: linux.riscv64,\n", "");
        fs::write(path, text)?;
        Ok(())
    }

    fn write_directory_in_place(path: &Path, _content: &[u8]) -> Result<()> {
        fs::remove_file(path)?;
        fs::create_dir(path)?;
        fs::write(path.join("occupied"), b"x")?;
        Ok(())
    }

    #[test]
    fn failed_read_back_restores_identical_bytes() {
        let (_dir, target) = project_with_loader(LOADER);
        let patcher = LoaderPatcher::with_writer(target.clone(), write_dropping_new_entry);

        let err = patcher.apply().unwrap_err();
        assert_eq!(err.code(), "PATCH_VERIFY_FAILURE");
        assert_eq!(fs::read(&target.file_path).unwrap(), LOADER.as_bytes());
        assert_eq!(
            sibling_files(target.file_path.parent().unwrap()),
            vec!["index.js"]
        );
    }

    #[test]
    fn failed_restore_is_rollback_failure_and_keeps_backup() {
        let (_dir, target) = project_with_loader(LOADER);
        let patcher = LoaderPatcher::with_writer(target.clone(), write_directory_in_place);

        let err = patcher.apply().unwrap_err();
        assert_eq!(err.code(), "ROLLBACK_FAILED");
        assert!(err.to_string().contains("index.js.swcrv-backup"), "{err}");
        assert_eq!(fs::read(target.backup_path()).unwrap(), LOADER.as_bytes());
    }

    #[test]
    fn missing_table_is_apply_failure() {
        let (_dir, target) = project_with_loader("module.exports = {};\n");
        let err = LoaderPatcher::new(target.clone()).apply().unwrap_err();
        assert_eq!(err.code(), "PATCH_APPLY_FAILURE");
        assert_eq!(
            fs::read_to_string(&target.file_path).unwrap(),
            "module.exports = {};\n"
        );
    }

    #[test]
    fn missing_file_is_target_not_found_and_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let target = PatchTarget::for_project(dir.path(), "linux", "riscv64", &Config::from_defaults());
        let err = LoaderPatcher::new(target).apply().unwrap_err();
        assert_eq!(err.code(), "TARGET_NOT_FOUND");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn native_entry_counts_as_applied() {
        let content = LOADER.replace(
            "            arm: linux.arm\n",
            "            arm: linux.arm,\n            riscv64: linux.riscv64.filter(Boolean)\n",
        );
        let (_dir, target) = project_with_loader(&content);
        let outcome = LoaderPatcher::new(target.clone()).apply().unwrap();
        assert_eq!(outcome, PatchOutcome::AlreadyApplied);
        assert_eq!(fs::read_to_string(&target.file_path).unwrap(), content);
    }

    #[test]
    fn revert_restores_original() {
        let (_dir, target) = project_with_loader(LOADER);
        let patcher = LoaderPatcher::new(target.clone());

        assert_eq!(patcher.revert().unwrap(), PatchOutcome::NotApplied);
        patcher.apply().unwrap();
        assert_eq!(patcher.revert().unwrap(), PatchOutcome::Reverted);
        assert_eq!(fs::read_to_string(&target.file_path).unwrap(), LOADER);
    }

    #[test]
    fn stale_backup_from_interrupted_run_is_cleared() {
        let (_dir, target) = project_with_loader(LOADER);
        fs::write(target.backup_path(), LOADER).unwrap();

        assert_eq!(
            LoaderPatcher::new(target.clone()).apply().unwrap(),
            PatchOutcome::Applied
        );
        assert!(!target.backup_path().exists());
    }
}
