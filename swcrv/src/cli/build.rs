// swcrv/src/cli/build.rs
use std::path::PathBuf;

use clap::Args;
use swcrv_common::config::Config;
use swcrv_common::error::Result;
use swcrv_common::model::release::ReleaseDescriptor;
use swcrv_common::model::target::{Abi, Target};
use swcrv_common::pipeline::{Outcome, PipelineResult, Stage};
use swcrv_core::build::{build_binding, BuildRequest};
use tracing::instrument;

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Host framework version the binding is built for
    #[arg(value_name = "VERSION")]
    pub framework_version: String,

    /// Crate that produces the binding's cdylib
    #[arg(long, value_name = "DIR")]
    pub source_dir: PathBuf,

    /// Where the .node file and SHA256SUMS are written
    #[arg(long, value_name = "DIR", default_value = "dist")]
    pub out_dir: PathBuf,

    #[arg(long, default_value = "riscv64")]
    pub arch: String,

    #[arg(long, default_value = "gnu")]
    pub abi: Abi,

    #[arg(long, default_value_t = 1)]
    pub revision: u32,
}

impl BuildArgs {
    #[instrument(skip(self, config), fields(version = %self.framework_version))]
    pub async fn run(&self, config: &Config) -> PipelineResult {
        match self.build(config).await {
            Ok(message) => PipelineResult::success(Stage::Build, Outcome::Success, message, vec![]),
            Err(e) => PipelineResult::failure(Stage::Build, e, vec![]),
        }
    }

    async fn build(&self, config: &Config) -> Result<String> {
        let target = Target::linux(&self.arch, self.abi)?;
        let descriptor =
            ReleaseDescriptor::resolve(&self.framework_version, &target, self.revision, config)?;
        let request = BuildRequest {
            descriptor,
            source_dir: self.source_dir.clone(),
            out_dir: self.out_dir.clone(),
        };
        let output = build_binding(&request).await?;
        Ok(format!(
            "Built {} for release {} (sha256 {})",
            output.binary_path.display(),
            request.descriptor.tag,
            output.sha256
        ))
    }
}
