// swcrv-common/src/model/mod.rs
// Declares the modules within the model directory.
pub mod artifact;
pub mod package;
pub mod patch;
pub mod release;
pub mod target;

// Re-export
pub use artifact::Artifact;
pub use package::{InstalledPackage, PackageManifest};
pub use patch::{Backup, PatchTarget, TableLocator};
pub use release::ReleaseDescriptor;
pub use target::{Abi, Platform, Target};
