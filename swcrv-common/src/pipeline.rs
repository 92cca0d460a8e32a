// swcrv-common/src/pipeline.rs
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SwcrvError;

/// Stages of one install run, in execution order. `Build` only appears in
/// results of the standalone build command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Preflight,
    Fetch,
    ChecksumVerify,
    PackageInstall,
    LoaderPatch,
    InstallVerify,
    Build,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Preflight => "preflight",
            Stage::Fetch => "fetch",
            Stage::ChecksumVerify => "checksum-verify",
            Stage::PackageInstall => "package-install",
            Stage::LoaderPatch => "loader-patch",
            Stage::InstallVerify => "install-verify",
            Stage::Build => "build",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    AlreadyApplied,
    Failure,
}

/// Terminal artifact of a run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub stage: Stage,
    pub outcome: Outcome,
    pub message: String,
    pub warnings: Vec<String>,
    pub error: Option<SwcrvError>,
}

impl PipelineResult {
    pub fn success(stage: Stage, outcome: Outcome, message: String, warnings: Vec<String>) -> Self {
        Self {
            stage,
            outcome,
            message,
            warnings,
            error: None,
        }
    }

    pub fn failure(stage: Stage, error: SwcrvError, warnings: Vec<String>) -> Self {
        Self {
            stage,
            outcome: Outcome::Failure,
            message: format!("[{stage}] {}: {error}", error.code()),
            warnings,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome != Outcome::Failure
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_names_stage_and_code() {
        let result = PipelineResult::failure(
            Stage::ChecksumVerify,
            SwcrvError::ChecksumMismatch("bad".into()),
            vec![],
        );
        assert_eq!(result.exit_code(), 1);
        assert!(result.message.starts_with("[checksum-verify] CHECKSUM_MISMATCH"));
    }

    #[test]
    fn already_applied_is_success() {
        let result = PipelineResult::success(
            Stage::InstallVerify,
            Outcome::AlreadyApplied,
            "done".into(),
            vec!["warn".into()],
        );
        assert_eq!(result.exit_code(), 0);
    }
}
