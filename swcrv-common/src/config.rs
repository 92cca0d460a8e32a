// swcrv-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use tracing::debug;

use super::error::{Result, SwcrvError};

const DEFAULT_RELEASE_REPO: &str = "swcrv/next-swc-riscv64";
const DEFAULT_DOWNLOAD_BASE_URL: &str = "https://github.com";
const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(60);

/// Conventions of the host framework whose loader gets patched and whose
/// platform-package layout the installer follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFramework {
    /// npm package of the framework itself (`next`).
    pub framework_package: String,
    /// npm scope of the platform packages, without `@`.
    pub scope: String,
    /// Prefix of the platform package directory (`swc` in `@next/swc-linux-x64-gnu`).
    pub package_base_name: String,
    /// Prefix of the `.node` binary (`next-swc` in `next-swc.linux-x64-gnu.node`).
    pub binary_base_name: String,
    /// Loader file, relative to the framework package directory.
    pub loader_path: PathBuf,
    /// Text that opens the region holding the architecture table.
    pub table_scope: String,
    /// Architecture whose entry the new one is placed after.
    pub anchor_arch: String,
    /// Framework versions the loader patch has been checked against.
    pub tested_versions: Vec<String>,
}

impl HostFramework {
    pub fn next_swc() -> Self {
        Self {
            framework_package: "next".to_string(),
            scope: "next".to_string(),
            package_base_name: "swc".to_string(),
            binary_base_name: "next-swc".to_string(),
            loader_path: PathBuf::from("dist/build/swc/index.js"),
            table_scope: "getSupportedArchTriples".to_string(),
            anchor_arch: "arm64".to_string(),
            tested_versions: ["13.5.4", "13.5.5", "13.5.6"]
                .iter()
                .map(|v| v.to_string())
                .collect(),
        }
    }
}

impl Default for HostFramework {
    fn default() -> Self {
        Self::next_swc()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub release_repo: String,
    pub download_base_url: String,
    pub api_base_url: String,
    pub github_token: Option<String>,
    pub http_timeout: Duration,
    pub connect_timeout: Duration,
    pub verify_timeout: Duration,
    pub node_binary: Option<PathBuf>,
    pub tmp_root: PathBuf,
    pub data_dir: PathBuf,
    pub host: HostFramework,
}

impl Config {
    /// Built-in defaults, without consulting the environment.
    pub fn from_defaults() -> Self {
        let tmp_root = env::temp_dir();
        Self {
            release_repo: DEFAULT_RELEASE_REPO.to_string(),
            download_base_url: DEFAULT_DOWNLOAD_BASE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            github_token: None,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            verify_timeout: DEFAULT_VERIFY_TIMEOUT,
            node_binary: None,
            data_dir: tmp_root.join("swcrv"),
            tmp_root,
            host: HostFramework::next_swc(),
        }
    }

    pub fn load() -> Result<Self> {
        debug!("Loading swcrv configuration");
        let mut config = Self::from_defaults();

        if let Some(repo) = env_non_empty("SWCRV_RELEASE_REPO") {
            config.release_repo = repo;
        }
        if config.release_repo.split('/').count() != 2 {
            return Err(SwcrvError::Config(format!(
                "SWCRV_RELEASE_REPO must look like 'owner/repo', got '{}'",
                config.release_repo
            )));
        }
        if let Some(url) = env_non_empty("SWCRV_DOWNLOAD_BASE_URL") {
            config.download_base_url = url;
        }
        if let Some(url) = env_non_empty("SWCRV_API_BASE_URL") {
            config.api_base_url = url;
        }
        config.github_token =
            env_non_empty("SWCRV_GITHUB_TOKEN").or_else(|| env_non_empty("GITHUB_TOKEN"));

        config.http_timeout = env_duration("SWCRV_HTTP_TIMEOUT", DEFAULT_HTTP_TIMEOUT)?;
        config.connect_timeout = env_duration("SWCRV_CONNECT_TIMEOUT", DEFAULT_CONNECT_TIMEOUT)?;
        config.verify_timeout = env_duration("SWCRV_VERIFY_TIMEOUT", DEFAULT_VERIFY_TIMEOUT)?;

        config.node_binary = env_non_empty("SWCRV_NODE").map(PathBuf::from);
        if let Some(tmp) = env_non_empty("SWCRV_TMPDIR") {
            config.tmp_root = PathBuf::from(tmp);
        }

        // Without a home directory (containers, CI) stay next to the temp root.
        config.data_dir = ProjectDirs::from("", "", "swcrv")
            .map(|dirs| dirs.data_local_dir().to_path_buf())
            .unwrap_or_else(|| config.tmp_root.join("swcrv"));
        debug!("Effective data dir set to: {}", config.data_dir.display());

        debug!("Configuration loaded successfully.");
        Ok(config)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn release_download_base(&self) -> String {
        format!(
            "{}/{}/releases/download",
            self.download_base_url.trim_end_matches('/'),
            self.release_repo
        )
    }

    pub fn releases_api_url(&self) -> String {
        format!(
            "{}/repos/{}/releases",
            self.api_base_url.trim_end_matches('/'),
            self.release_repo
        )
    }

    pub fn node_modules_dir(&self, project_dir: &Path) -> PathBuf {
        project_dir.join("node_modules")
    }

    pub fn framework_dir(&self, project_dir: &Path) -> PathBuf {
        self.node_modules_dir(project_dir)
            .join(&self.host.framework_package)
    }

    pub fn framework_manifest_path(&self, project_dir: &Path) -> PathBuf {
        self.framework_dir(project_dir).join("package.json")
    }

    pub fn loader_file_path(&self, project_dir: &Path) -> PathBuf {
        self.framework_dir(project_dir).join(&self.host.loader_path)
    }

    pub fn scope_dir(&self, project_dir: &Path) -> PathBuf {
        self.node_modules_dir(project_dir)
            .join(format!("@{}", self.host.scope))
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn env_duration(key: &str, default: Duration) -> Result<Duration> {
    match env_non_empty(key) {
        Some(raw) => humantime::parse_duration(raw.trim()).map_err(|e| {
            SwcrvError::Config(format!("{key} must be a duration like '90s' or '5m': {e}"))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            release_repo: "owner/repo".into(),
            download_base_url: "https://github.com/".into(),
            ..Config::from_defaults()
        }
    }

    #[test]
    fn builds_release_urls() {
        let config = test_config();
        assert_eq!(
            config.release_download_base(),
            "https://github.com/owner/repo/releases/download"
        );
        assert_eq!(
            config.releases_api_url(),
            "https://api.github.com/repos/owner/repo/releases"
        );
    }

    #[test]
    fn builds_project_paths() {
        let config = test_config();
        let project = Path::new("/srv/app");
        assert_eq!(
            config.loader_file_path(project),
            PathBuf::from("/srv/app/node_modules/next/dist/build/swc/index.js")
        );
        assert_eq!(
            config.scope_dir(project),
            PathBuf::from("/srv/app/node_modules/@next")
        );
    }
}
