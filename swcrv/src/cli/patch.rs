// swcrv/src/cli/patch.rs
use std::path::PathBuf;

use clap::Args;
use swcrv_common::config::Config;
use swcrv_common::pipeline::PipelineResult;
use swcrv_core::pipeline::{run_patch, PatchAction};

#[derive(Args, Debug)]
pub struct PatchApply {
    /// Project directory containing node_modules
    pub project_dir: PathBuf,

    #[arg(long, default_value = "riscv64")]
    pub arch: String,
}

impl PatchApply {
    pub fn run(&self, config: &Config) -> PipelineResult {
        run_patch(config, &self.project_dir, &self.arch, PatchAction::Apply)
    }
}

#[derive(Args, Debug)]
pub struct PatchRevert {
    /// Project directory containing node_modules
    pub project_dir: PathBuf,

    #[arg(long, default_value = "riscv64")]
    pub arch: String,
}

impl PatchRevert {
    pub fn run(&self, config: &Config) -> PipelineResult {
        run_patch(config, &self.project_dir, &self.arch, PatchAction::Revert)
    }
}
