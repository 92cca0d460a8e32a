// swcrv-core/src/install/mod.rs
pub mod package;

use std::path::Path;

use swcrv_aio::fs::create_dir_all;
use swcrv_aio::json_io::to_json_bytes;
use swcrv_common::config::Config;
use swcrv_common::error::Result;
use swcrv_common::model::release::package_dir_name;
use swcrv_common::model::{InstalledPackage, PackageManifest};
use tracing::{debug, info, instrument};

use crate::checksum::VerifiedArtifact;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub package: InstalledPackage,
    /// `false` when an identical package was already in place.
    pub changed: bool,
}

/// Places a verified binary plus its `package.json` where Node's resolver
/// looks for the platform package.
pub struct PackageInstaller<'a> {
    config: &'a Config,
}

impl<'a> PackageInstaller<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    #[instrument(skip(self, artifact), fields(project = %project_dir.display()))]
    pub fn install(&self, project_dir: &Path, artifact: &VerifiedArtifact) -> Result<InstallReport> {
        let host = &self.config.host;
        let descriptor = &artifact.artifact().descriptor;
        let target = &descriptor.target;

        let final_dir = self
            .config
            .scope_dir(project_dir)
            .join(package_dir_name(host, target));
        let manifest = PackageManifest::for_target(host, target, &descriptor.version);
        let manifest_content = to_json_bytes(&manifest)?;
        let installed = InstalledPackage {
            directory_path: final_dir.clone(),
            manifest_content,
            binary_file_name: manifest.main.clone(),
            package_name: manifest.name.clone(),
        };

        package::clean_leftovers(&final_dir)?;

        if package::is_identical(
            &final_dir,
            &installed.binary_file_name,
            &artifact.artifact().computed_digest,
            &installed.manifest_content,
        )? {
            info!("{} is already installed and identical", installed.package_name);
            return Ok(InstallReport {
                package: installed,
                changed: false,
            });
        }

        create_dir_all(&self.config.scope_dir(project_dir))?;
        let staging = package::staging_path(&final_dir)?;
        package::stage(
            &staging,
            artifact.path(),
            &installed.binary_file_name,
            &installed.manifest_content,
        )?;
        package::swap_into_place(&staging, &final_dir)?;

        debug!("Installed {} into {}", installed.package_name, final_dir.display());
        info!("Installed {}@{}", installed.package_name, manifest.version);
        Ok(InstallReport {
            package: installed,
            changed: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use swcrv_common::model::release::ReleaseDescriptor;
    use swcrv_common::model::target::{Abi, Target};
    use swcrv_common::model::Artifact;

    use super::*;
    use crate::checksum::verify_artifact;

    const HELLO: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    fn verified(workdir: &Path, config: &Config) -> VerifiedArtifact {
        let path = workdir.join("next-swc.linux-riscv64-gnu.node");
        fs::write(&path, b"hello").unwrap();
        let target = Target::linux("riscv64", Abi::Gnu).unwrap();
        let artifact = Artifact {
            descriptor: ReleaseDescriptor::resolve("13.5.6", &target, 1, config).unwrap(),
            path,
            size: 5,
            declared_digest: Some(HELLO.into()),
            computed_digest: HELLO.into(),
        };
        verify_artifact(artifact, &mut Vec::new()).unwrap()
    }

    #[test]
    fn installs_package_where_the_resolver_looks() {
        let project = tempfile::tempdir().unwrap();
        let workdir = tempfile::tempdir().unwrap();
        let config = Config::from_defaults();
        let artifact = verified(workdir.path(), &config);

        let report = PackageInstaller::new(&config)
            .install(project.path(), &artifact)
            .unwrap();
        assert!(report.changed);

        let dir = project.path().join("node_modules/@next/swc-linux-riscv64-gnu");
        assert_eq!(report.package.directory_path, dir);
        assert_eq!(
            fs::read(dir.join("next-swc.linux-riscv64-gnu.node")).unwrap(),
            b"hello"
        );
        let manifest: serde_json::Value =
            serde_json::from_slice(&fs::read(dir.join("package.json")).unwrap()).unwrap();
        assert_eq!(manifest["name"], "@next/swc-linux-riscv64-gnu");
        assert_eq!(manifest["main"], "next-swc.linux-riscv64-gnu.node");
        assert_eq!(manifest["cpu"][0], "riscv64");
    }

    #[test]
    fn reinstall_is_byte_identical_and_skipped() {
        let project = tempfile::tempdir().unwrap();
        let workdir = tempfile::tempdir().unwrap();
        let config = Config::from_defaults();
        let artifact = verified(workdir.path(), &config);
        let installer = PackageInstaller::new(&config);

        let first = installer.install(project.path(), &artifact).unwrap();
        let manifest_before = fs::read(first.package.manifest_path()).unwrap();
        let second = installer.install(project.path(), &artifact).unwrap();

        assert!(!second.changed);
        assert_eq!(fs::read(second.package.manifest_path()).unwrap(), manifest_before);
        let scope = project.path().join("node_modules/@next");
        assert_eq!(fs::read_dir(scope).unwrap().count(), 1);
    }

    #[test]
    fn overwrite_replaces_foreign_contents() {
        let project = tempfile::tempdir().unwrap();
        let workdir = tempfile::tempdir().unwrap();
        let config = Config::from_defaults();
        let dir = project.path().join("node_modules/@next/swc-linux-riscv64-gnu");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("package.json"), b"{\"name\":\"broken\"}").unwrap();
        fs::write(dir.join("leftover.node"), b"x").unwrap();

        let report = PackageInstaller::new(&config)
            .install(project.path(), &verified(workdir.path(), &config))
            .unwrap();

        assert!(report.changed);
        assert!(!dir.join("leftover.node").exists());
        assert_eq!(fs::read(dir.join("package.json")).unwrap(), report.package.manifest_content);
    }
}
