// swcrv-core/src/lib.rs

pub mod build;
pub mod check;
pub mod checksum;
pub mod fetch;
pub mod install;
pub mod patch;
pub mod pipeline;

// Re-export key types for the CLI crate
pub use build::{build_binding, BuildOutput, BuildRequest};
pub use checksum::VerifiedArtifact;
pub use patch::{LoaderPatcher, PatchOutcome};
pub use pipeline::{run_install, run_patch, InstallRequest, PatchAction};
