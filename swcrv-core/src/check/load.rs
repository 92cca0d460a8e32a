// swcrv-core/src/check/load.rs
//! Asks a real Node process to resolve and load the installed package.

use std::path::{Path, PathBuf};

use swcrv_aio::process::run_command_async;
use swcrv_common::config::Config;
use swcrv_common::error::{Result, SwcrvError};
use tracing::{debug, info, instrument};

/// `process.argv` is `[node, packageName, projectDir]` under `node -e`.
const LOAD_SCRIPT: &str = r#"
const [name, dir] = process.argv.slice(1);
const resolved = require.resolve(name, { paths: [dir] });
require(resolved);
console.log(resolved);
"#;

pub struct InstallVerifier<'a> {
    config: &'a Config,
}

impl<'a> InstallVerifier<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    fn node_binary(&self) -> Result<PathBuf> {
        if let Some(node) = &self.config.node_binary {
            return Ok(node.clone());
        }
        which::which("node").map_err(|e| {
            SwcrvError::LoadVerificationFailed(format!("node executable not found on PATH: {e}"))
        })
    }

    /// Resolves `package_name` from `project_dir` and requires it.
    #[instrument(skip(self), fields(project = %project_dir.display()))]
    pub async fn verify(&self, project_dir: &Path, package_name: &str) -> Result<()> {
        let node = self.node_binary()?;
        let args = vec![
            "-e".to_string(),
            LOAD_SCRIPT.to_string(),
            package_name.to_string(),
            project_dir.display().to_string(),
        ];
        let output = run_command_async(
            node.display().to_string(),
            args,
            Some(project_dir.to_path_buf()),
            None,
            self.config.verify_timeout,
        )
        .await
        .map_err(|e| SwcrvError::LoadVerificationFailed(e.to_string()))?;

        if output.status.success() {
            let resolved = String::from_utf8_lossy(&output.stdout);
            debug!("node resolved {} to {}", package_name, resolved.trim());
            info!("{} loads in Node", package_name);
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr
            .lines()
            .map(str::trim)
            .find(|l| l.starts_with("Error") || l.contains("Error:"))
            .unwrap_or_else(|| stderr.trim());
        Err(SwcrvError::LoadVerificationFailed(format!(
            "node exited with {} while loading {}: {}",
            output.status, package_name, detail
        )))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    fn fake_node(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("node");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn config(node: PathBuf) -> Config {
        Config {
            node_binary: Some(node),
            ..Config::from_defaults()
        }
    }

    #[tokio::test]
    async fn zero_exit_means_loadable() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(fake_node(dir.path(), "echo \"$3\""));
        InstallVerifier::new(&config)
            .verify(dir.path(), "@next/swc-linux-riscv64-gnu")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn load_failure_carries_node_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(fake_node(
            dir.path(),
            "echo 'Error: Cannot find module' >&2; exit 1",
        ));
        let err = InstallVerifier::new(&config)
            .verify(dir.path(), "@next/swc-linux-riscv64-gnu")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "LOAD_VERIFICATION_FAILED");
        assert!(err.to_string().contains("Cannot find module"));
    }

    #[tokio::test]
    async fn missing_node_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path().join("no-such-node"));
        let err = InstallVerifier::new(&config)
            .verify(dir.path(), "@next/swc-linux-riscv64-gnu")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "LOAD_VERIFICATION_FAILED");
    }
}
