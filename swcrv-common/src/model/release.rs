// swcrv-common/src/model/release.rs
use serde::{Deserialize, Serialize};

use crate::config::{Config, HostFramework};
use crate::error::{Result, SwcrvError};
use crate::model::target::Target;

/// Name of the digest manifest published next to the binaries of a release.
pub const DIGEST_MANIFEST_NAME: &str = "SHA256SUMS";

/// Identifies exactly one fetchable artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDescriptor {
    pub package_name: String,
    pub version: semver::Version,
    pub target: Target,
    pub revision: u32,
    pub tag: String,
    pub asset_name: String,
    pub download_url: String,
    pub digest_url: String,
}

impl ReleaseDescriptor {
    pub fn resolve(version: &str, target: &Target, revision: u32, config: &Config) -> Result<Self> {
        let version = parse_version(version)?;
        let tag = release_tag(&version, target, revision);
        let asset_name = binary_file_name(&config.host, target);
        let base = config.release_download_base();

        Ok(Self {
            package_name: package_name(&config.host, target),
            download_url: format!("{base}/{tag}/{asset_name}"),
            digest_url: format!("{base}/{tag}/{DIGEST_MANIFEST_NAME}"),
            version,
            target: target.clone(),
            revision,
            tag,
            asset_name,
        })
    }
}

pub fn parse_version(raw: &str) -> Result<semver::Version> {
    let trimmed = raw.trim().trim_start_matches('v');
    semver::Version::parse(trimmed)
        .map_err(|e| SwcrvError::InvalidVersion(raw.to_string(), e.to_string()))
}

/// `13.5.6-riscv64-1`
pub fn release_tag(version: &semver::Version, target: &Target, revision: u32) -> String {
    format!("{version}-{}-{revision}", target.arch)
}

/// `next-swc.linux-riscv64-gnu.node`
pub fn binary_file_name(host: &HostFramework, target: &Target) -> String {
    format!("{}.{}.node", host.binary_base_name, target.platform_arch_abi())
}

/// `swc-linux-riscv64-gnu`
pub fn package_dir_name(host: &HostFramework, target: &Target) -> String {
    format!("{}-{}", host.package_base_name, target.platform_arch_abi())
}

/// `@next/swc-linux-riscv64-gnu`
pub fn package_name(host: &HostFramework, target: &Target) -> String {
    format!("@{}/{}", host.scope, package_dir_name(host, target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::target::Abi;

    fn config() -> Config {
        Config {
            release_repo: "owner/repo".into(),
            ..Config::from_defaults()
        }
    }

    #[test]
    fn resolves_descriptor_for_riscv64() {
        let target = Target::linux("riscv64", Abi::Gnu).unwrap();
        let descriptor = ReleaseDescriptor::resolve("13.5.6", &target, 1, &config()).unwrap();

        assert_eq!(descriptor.package_name, "@next/swc-linux-riscv64-gnu");
        assert_eq!(descriptor.tag, "13.5.6-riscv64-1");
        assert_eq!(descriptor.asset_name, "next-swc.linux-riscv64-gnu.node");
        assert_eq!(
            descriptor.download_url,
            "https://github.com/owner/repo/releases/download/13.5.6-riscv64-1/next-swc.linux-riscv64-gnu.node"
        );
        assert_eq!(
            descriptor.digest_url,
            "https://github.com/owner/repo/releases/download/13.5.6-riscv64-1/SHA256SUMS"
        );
    }

    #[test]
    fn accepts_leading_v_and_rejects_garbage() {
        assert_eq!(parse_version("v13.5.6").unwrap().to_string(), "13.5.6");
        let err = parse_version("thirteen").unwrap_err();
        assert_eq!(err.code(), "INVALID_VERSION");
    }

    #[test]
    fn descriptor_serializes_version_as_string() {
        let target = Target::linux("riscv64", Abi::Gnu).unwrap();
        let descriptor = ReleaseDescriptor::resolve("13.5.6", &target, 2, &config()).unwrap();

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["version"], "13.5.6");
        let back: ReleaseDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(back, descriptor);
    }
}
