// swcrv-core/src/pipeline.rs
//! Sequences the install stages and turns their outcome into a `PipelineResult`.

use std::path::PathBuf;

use swcrv_common::config::Config;
use swcrv_common::error::{Result, SwcrvError};
use swcrv_common::model::release::ReleaseDescriptor;
use swcrv_common::model::target::{Abi, Platform, Target};
use swcrv_common::model::PatchTarget;
use swcrv_common::pipeline::{Outcome, PipelineResult, Stage};
use swcrv_net::http::build_http_client;
use tracing::{debug, info, instrument, warn};

use crate::check::{check_arch, check_framework_present, check_tested_version, InstallVerifier};
use crate::checksum::verify_artifact;
use crate::fetch::{create_workdir, ArtifactSource, ReleaseFetcher};
use crate::install::PackageInstaller;
use crate::patch::{LoaderPatcher, PatchOutcome};

#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub version: String,
    pub project_dir: PathBuf,
    pub arch: String,
    pub abi: Abi,
    pub revision: u32,
    /// Use this file instead of downloading the release asset.
    pub artifact: Option<PathBuf>,
    /// Expected digest, replacing the published digest manifest.
    pub sha256: Option<String>,
    pub force_arch: bool,
    pub skip_verify: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchAction {
    Apply,
    Revert,
}

struct Run {
    stage: Stage,
    warnings: Vec<String>,
}

impl Run {
    fn new() -> Self {
        Self {
            stage: Stage::Preflight,
            warnings: Vec::new(),
        }
    }

    fn enter(&mut self, stage: Stage) {
        debug!("Entering stage {}", stage);
        self.stage = stage;
    }

    fn finish(self, result: Result<(Outcome, String)>) -> PipelineResult {
        match result {
            Ok((outcome, message)) => {
                PipelineResult::success(self.stage, outcome, message, self.warnings)
            }
            Err(error) => PipelineResult::failure(self.stage, error, self.warnings),
        }
    }
}

/// Fetch, verify, install, patch and load-check one prebuilt binding.
#[instrument(skip(config, request), fields(version = %request.version, project = %request.project_dir.display()))]
pub async fn run_install(config: &Config, request: &InstallRequest) -> PipelineResult {
    let mut run = Run::new();
    let result = install_stages(config, request, &mut run).await;
    run.finish(result)
}

async fn install_stages(
    config: &Config,
    request: &InstallRequest,
    run: &mut Run,
) -> Result<(Outcome, String)> {
    run.enter(Stage::Preflight);
    let target = Target::linux(&request.arch, request.abi)?;
    let descriptor = ReleaseDescriptor::resolve(&request.version, &target, request.revision, config)?;
    check_framework_present(config, &request.project_dir)?;
    check_tested_version(config, &request.project_dir, &mut run.warnings);
    check_arch(&target.arch, request.force_arch, &mut run.warnings)?;

    run.enter(Stage::Fetch);
    let client = build_http_client(config)?;
    let workdir = create_workdir(config)?;
    let source = match &request.artifact {
        Some(path) => ArtifactSource::Local(path.clone()),
        None => ArtifactSource::Release,
    };
    let artifact = ReleaseFetcher::new(&client, config)
        .fetch(&descriptor, &source, request.sha256.as_deref(), workdir.path())
        .await?;

    run.enter(Stage::ChecksumVerify);
    let verified = verify_artifact(artifact, &mut run.warnings)?;

    run.enter(Stage::PackageInstall);
    let report = PackageInstaller::new(config).install(&request.project_dir, &verified)?;
    drop(workdir);

    run.enter(Stage::LoaderPatch);
    let patch_target =
        PatchTarget::for_project(&request.project_dir, target.platform.as_str(), &target.arch, config);
    let patched = LoaderPatcher::new(patch_target).apply()?;

    run.enter(Stage::InstallVerify);
    if request.skip_verify {
        let message = "Load verification skipped (--skip-verify)".to_string();
        info!("{}", message);
        run.warnings.push(message);
    } else if let Err(e) = InstallVerifier::new(config)
        .verify(&request.project_dir, &report.package.package_name)
        .await
    {
        let message = format!("{}: {}", e.code(), e);
        warn!("{}", message);
        run.warnings.push(message);
    }

    let outcome = match patched {
        PatchOutcome::AlreadyApplied => Outcome::AlreadyApplied,
        _ => Outcome::Success,
    };
    let message = format!(
        "{}@{} {} in {} ({}); loader patch {}",
        report.package.package_name,
        descriptor.version,
        if report.changed { "installed" } else { "already installed" },
        report.package.directory_path.display(),
        if verified.digest_checked() { "sha256 verified" } else { "sha256 unchecked" },
        patched
    );
    Ok((outcome, message))
}

/// Applies or reverts only the loader patch.
#[instrument(skip(config), fields(project = %project_dir.display()))]
pub fn run_patch(
    config: &Config,
    project_dir: &std::path::Path,
    arch: &str,
    action: PatchAction,
) -> PipelineResult {
    let mut run = Run::new();
    let result = patch_stages(config, project_dir, arch, action, &mut run);
    run.finish(result)
}

fn patch_stages(
    config: &Config,
    project_dir: &std::path::Path,
    arch: &str,
    action: PatchAction,
    run: &mut Run,
) -> Result<(Outcome, String)> {
    run.enter(Stage::Preflight);
    let target = Target::linux(arch, Abi::None)?;
    if !project_dir.is_dir() {
        return Err(SwcrvError::TargetNotFound(format!(
            "project directory {} does not exist",
            project_dir.display()
        )));
    }
    if action == PatchAction::Apply {
        check_tested_version(config, project_dir, &mut run.warnings);
    }

    run.enter(Stage::LoaderPatch);
    let patch_target =
        PatchTarget::for_project(project_dir, Platform::Linux.as_str(), &target.arch, config);
    let file = patch_target.file_path.display().to_string();
    let patcher = LoaderPatcher::new(patch_target);
    let outcome = match action {
        PatchAction::Apply => patcher.apply()?,
        PatchAction::Revert => patcher.revert()?,
    };
    let pipeline_outcome = match outcome {
        PatchOutcome::AlreadyApplied => Outcome::AlreadyApplied,
        _ => Outcome::Success,
    };
    Ok((pipeline_outcome, format!("Loader patch {outcome} in {file}")))
}
