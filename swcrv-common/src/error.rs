use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SwcrvError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("HTTP Request Error: {0}")]
    Http(#[from] Arc<reqwest::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Invalid version '{0}': {1}")]
    InvalidVersion(String, String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Validation Error: {0}")]
    ValidationError(String),

    #[error("Host architecture '{host}' does not match requested target '{requested}'")]
    ArchMismatch { host: String, requested: String },

    #[error("Release '{tag}' has no asset '{asset}' (available tags: {available})")]
    ReleaseNotFound {
        tag: String,
        asset: String,
        available: String,
    },

    #[error("Network Error while fetching '{0}': {1}")]
    NetworkError(String, String),

    #[error("Checksum Mismatch: {0}")]
    ChecksumMismatch(String),

    #[error("Target not found: {0}")]
    TargetNotFound(String),

    #[error("Patch could not be applied to {0}: {1}")]
    PatchApplyFailure(String, String),

    #[error("Patch verification failed for {0}: {1}")]
    PatchVerifyFailure(String, String),

    #[error("Rollback of {path} failed ({reason}); original content kept at {backup}")]
    RollbackFailed {
        path: String,
        reason: String,
        backup: String,
    },

    #[error("Loading the installed binding failed: {0}")]
    LoadVerificationFailed(String),

    #[error("Installation Error: {0}")]
    InstallError(String),

    #[error("Build Error: {0}")]
    BuildError(String),

    #[error("IoError: {0}")]
    IoError(String),

    #[error("Generic Error: {0}")]
    Generic(String),
}

impl SwcrvError {
    /// Stable diagnostic code surfaced on stderr and in pipeline results.
    pub fn code(&self) -> &'static str {
        match self {
            SwcrvError::Io(_) | SwcrvError::IoError(_) => "IO_ERROR",
            SwcrvError::Http(_) | SwcrvError::NetworkError(..) => "NETWORK_ERROR",
            SwcrvError::Json(_) => "JSON_ERROR",
            SwcrvError::InvalidVersion(..) => "INVALID_VERSION",
            SwcrvError::Config(_) => "CONFIG_ERROR",
            SwcrvError::ValidationError(_) => "VALIDATION_ERROR",
            SwcrvError::ArchMismatch { .. } => "ARCH_MISMATCH",
            SwcrvError::ReleaseNotFound { .. } => "RELEASE_NOT_FOUND",
            SwcrvError::ChecksumMismatch(_) => "CHECKSUM_MISMATCH",
            SwcrvError::TargetNotFound(_) => "TARGET_NOT_FOUND",
            SwcrvError::PatchApplyFailure(..) => "PATCH_APPLY_FAILURE",
            SwcrvError::PatchVerifyFailure(..) => "PATCH_VERIFY_FAILURE",
            SwcrvError::RollbackFailed { .. } => "ROLLBACK_FAILED",
            SwcrvError::LoadVerificationFailed(_) => "LOAD_VERIFICATION_FAILED",
            SwcrvError::InstallError(_) => "INSTALL_ERROR",
            SwcrvError::BuildError(_) => "BUILD_ERROR",
            SwcrvError::Generic(_) => "GENERIC_ERROR",
        }
    }
}

impl From<std::io::Error> for SwcrvError {
    fn from(err: std::io::Error) -> Self {
        SwcrvError::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for SwcrvError {
    fn from(err: reqwest::Error) -> Self {
        SwcrvError::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for SwcrvError {
    fn from(err: serde_json::Error) -> Self {
        SwcrvError::Json(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, SwcrvError>;
