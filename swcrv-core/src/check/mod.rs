pub mod host;
pub mod load;

pub use host::{check_arch, check_framework_present, check_tested_version};
pub use load::InstallVerifier;
