// swcrv-common/src/model/package.rs
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::HostFramework;
use crate::model::release::{binary_file_name, package_name};
use crate::model::target::Target;

/// The `package.json` written into a platform package. Field order is the
/// serialization order and must stay stable for byte-identical reinstalls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    pub version: String,
    pub main: String,
    pub os: Vec<String>,
    pub cpu: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub libc: Option<Vec<String>>,
}

impl PackageManifest {
    pub fn for_target(host: &HostFramework, target: &Target, version: &semver::Version) -> Self {
        Self {
            name: package_name(host, target),
            version: version.to_string(),
            main: binary_file_name(host, target),
            os: vec![target.platform.as_str().to_string()],
            cpu: vec![target.arch.clone()],
            libc: target.abi.libc().map(|libc| vec![libc.to_string()]),
        }
    }
}

/// The on-disk unit the Node module resolver will find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub directory_path: PathBuf,
    pub manifest_content: Vec<u8>,
    pub binary_file_name: String,
    pub package_name: String,
}

impl InstalledPackage {
    pub fn manifest_path(&self) -> PathBuf {
        self.directory_path.join("package.json")
    }
}
