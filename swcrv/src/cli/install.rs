// swcrv/src/cli/install.rs
use std::path::PathBuf;

use clap::Args;
use swcrv_common::config::Config;
use swcrv_common::model::target::Abi;
use swcrv_common::pipeline::PipelineResult;
use swcrv_core::pipeline::{run_install, InstallRequest};
use tracing::instrument;

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Host framework version the binding was built for (e.g. 13.5.6)
    #[arg(value_name = "VERSION")]
    pub framework_version: String,

    /// Project directory containing node_modules
    pub project_dir: PathBuf,

    #[arg(long, default_value = "riscv64")]
    pub arch: String,

    #[arg(long, default_value = "gnu")]
    pub abi: Abi,

    /// Release revision for the same version and architecture
    #[arg(long, default_value_t = 1)]
    pub revision: u32,

    /// Install this local file instead of downloading the release asset
    #[arg(long, value_name = "PATH")]
    pub artifact: Option<PathBuf>,

    /// Expected SHA-256 of the binary, overriding the release's SHA256SUMS
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<String>,

    /// Continue when the requested architecture differs from this machine's
    #[arg(long)]
    pub force_arch: bool,

    /// Do not ask Node to load the installed package
    #[arg(long)]
    pub skip_verify: bool,
}

impl InstallArgs {
    #[instrument(skip(self, config), fields(version = %self.framework_version))]
    pub async fn run(&self, config: &Config) -> PipelineResult {
        let request = InstallRequest {
            version: self.framework_version.clone(),
            project_dir: self.project_dir.clone(),
            arch: self.arch.clone(),
            abi: self.abi,
            revision: self.revision,
            artifact: self.artifact.clone(),
            sha256: self.sha256.clone(),
            force_arch: self.force_arch,
            skip_verify: self.skip_verify,
        };
        run_install(config, &request).await
    }
}
