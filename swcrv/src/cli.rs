// swcrv/src/cli.rs
//! Defines the command-line argument structure using clap.
use clap::{ArgAction, Parser, Subcommand};
use swcrv_common::pipeline::PipelineResult;
use swcrv_common::Config;

pub mod build;
pub mod install;
pub mod patch;

use crate::cli::build::BuildArgs;
use crate::cli::install::InstallArgs;
use crate::cli::patch::{PatchApply, PatchRevert};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "swcrv", bin_name = "swcrv")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch, verify and install a prebuilt binding, then patch the loader
    Install(InstallArgs),
    /// Cross-compile the binding and lay it out like a release
    Build(BuildArgs),
    /// Only patch the loader table of an existing project
    PatchApply(PatchApply),
    /// Remove the loader table entry added by patch-apply
    PatchRevert(PatchRevert),
}

impl Command {
    pub async fn run(&self, config: &Config) -> PipelineResult {
        match self {
            Self::Install(command) => command.run(config).await,
            Self::Build(command) => command.run(config).await,
            Self::PatchApply(command) => command.run(config),
            Self::PatchRevert(command) => command.run(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn version_positional_coexists_with_version_flag() {
        let args = CliArgs::try_parse_from(["swcrv", "install", "13.5.6", "./app"]).unwrap();
        match args.command {
            Command::Install(install) => assert_eq!(install.framework_version, "13.5.6"),
            other => panic!("unexpected command {other:?}"),
        }
        let args =
            CliArgs::try_parse_from(["swcrv", "build", "13.5.6", "--source-dir", "crate"]).unwrap();
        assert!(matches!(args.command, Command::Build(b) if b.framework_version == "13.5.6"));
    }
}
