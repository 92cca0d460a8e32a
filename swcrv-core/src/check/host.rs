// swcrv-core/src/check/host.rs
//! Preflight checks against the target project and the running machine.

use std::path::Path;

use serde::Deserialize;
use swcrv_aio::json_io::read_json;
use swcrv_common::config::Config;
use swcrv_common::error::{Result, SwcrvError};
use swcrv_common::model::target::host_arch;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct FrameworkManifest {
    version: Option<String>,
}

/// The project directory must exist and contain the host framework's loader.
pub fn check_framework_present(config: &Config, project_dir: &Path) -> Result<()> {
    if !project_dir.is_dir() {
        return Err(SwcrvError::TargetNotFound(format!(
            "project directory {} does not exist",
            project_dir.display()
        )));
    }
    let loader = config.loader_file_path(project_dir);
    if !loader.is_file() {
        return Err(SwcrvError::TargetNotFound(format!(
            "{} not found; run the package manager install for '{}' first",
            loader.display(),
            config.host.framework_package
        )));
    }
    Ok(())
}

/// Installed framework version from its `package.json`, if readable.
pub fn framework_version(config: &Config, project_dir: &Path) -> Option<String> {
    let path = config.framework_manifest_path(project_dir);
    match read_json::<FrameworkManifest>(&path) {
        Ok(manifest) => manifest.version,
        Err(e) => {
            debug!("Could not read {}: {}", path.display(), e);
            None
        }
    }
}

/// Warns when the installed framework is not one the loader patch was checked
/// against. Never fails.
pub fn check_tested_version(config: &Config, project_dir: &Path, warnings: &mut Vec<String>) {
    let host = &config.host;
    let message = match framework_version(config, project_dir) {
        Some(version) if host.tested_versions.iter().any(|v| *v == version) => {
            debug!("{} {} is a tested version", host.framework_package, version);
            return;
        }
        Some(version) => format!(
            "{} {} has not been tested with the loader patch (tested: {})",
            host.framework_package,
            version,
            host.tested_versions.join(", ")
        ),
        None => format!(
            "Could not determine the installed {} version",
            host.framework_package
        ),
    };
    warn!("{}", message);
    warnings.push(message);
}

/// Compares the requested architecture with the machine's.
pub fn check_arch(requested: &str, force: bool, warnings: &mut Vec<String>) -> Result<()> {
    check_arch_against(host_arch(), requested, force, warnings)
}

pub fn check_arch_against(
    host: &str,
    requested: &str,
    force: bool,
    warnings: &mut Vec<String>,
) -> Result<()> {
    if host == requested {
        return Ok(());
    }
    let error = SwcrvError::ArchMismatch {
        host: host.to_string(),
        requested: requested.to_string(),
    };
    if !force {
        return Err(error);
    }
    let message = format!("{error}; continuing because --force-arch was given");
    warn!("{}", message);
    warnings.push(message);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn project(version: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let next = dir.path().join("node_modules/next");
        fs::create_dir_all(next.join("dist/build/swc")).unwrap();
        fs::write(next.join("dist/build/swc/index.js"), "").unwrap();
        fs::write(
            next.join("package.json"),
            format!("{{\"name\":\"next\",\"version\":\"{version}\"}}"),
        )
        .unwrap();
        dir
    }

    #[test]
    fn missing_framework_is_target_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_defaults();
        let err = check_framework_present(&config, dir.path()).unwrap_err();
        assert_eq!(err.code(), "TARGET_NOT_FOUND");

        let err = check_framework_present(&config, &dir.path().join("nope")).unwrap_err();
        assert_eq!(err.code(), "TARGET_NOT_FOUND");
    }

    #[test]
    fn untested_version_only_warns() {
        let config = Config::from_defaults();
        let mut warnings = Vec::new();

        let tested = project("13.5.6");
        check_framework_present(&config, tested.path()).unwrap();
        check_tested_version(&config, tested.path(), &mut warnings);
        assert!(warnings.is_empty());

        let untested = project("14.2.0");
        check_tested_version(&config, untested.path(), &mut warnings);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("14.2.0"));
    }

    #[test]
    fn arch_mismatch_is_fatal_unless_forced() {
        let mut warnings = Vec::new();
        check_arch_against("riscv64", "riscv64", false, &mut warnings).unwrap();

        let err = check_arch_against("x64", "riscv64", false, &mut warnings).unwrap_err();
        assert_eq!(err.code(), "ARCH_MISMATCH");
        assert!(warnings.is_empty());

        check_arch_against("x64", "riscv64", true, &mut warnings).unwrap();
        assert_eq!(warnings.len(), 1);
    }
}
