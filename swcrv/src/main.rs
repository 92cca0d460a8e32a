// swcrv/src/main.rs
use std::fs;
use std::process;

use clap::Parser;
use colored::Colorize;
use swcrv_common::config::Config;
use swcrv_common::pipeline::{Outcome, PipelineResult, Stage};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

mod cli;
use cli::CliArgs;

fn init_logging(config: &Config, verbose: u8) {
    let level_filter = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let max_log_level = level_filter.into_level().unwrap_or(tracing::Level::INFO);

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("SWCRV_LOG")
        .from_env_lossy();

    let log_dir = config.logs_dir();
    if verbose > 0 && fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::daily(&log_dir, "swcrv.log");
        let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);

        let stderr_writer = std::io::stderr.with_max_level(max_log_level);
        let file_writer = non_blocking_appender.with_max_level(max_log_level);

        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(stderr_writer.and(file_writer))
            .with_ansi(true)
            .without_time()
            .try_init();

        Box::leak(Box::new(guard)); // Keep guard alive

        debug!(
            "Verbose logging enabled. Writing logs to: {}/swcrv.log",
            log_dir.display()
        );
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .without_time()
            .try_init();
    }
}

fn report(result: &PipelineResult) {
    for warning in &result.warnings {
        eprintln!("{} {}", "Warning:".yellow().bold(), warning);
    }
    match result.outcome {
        Outcome::Success => println!("{} {}", "==>".bold().green(), result.message),
        Outcome::AlreadyApplied => println!(
            "{} {} {}",
            "==>".bold().green(),
            "AlreadyApplied:".bold(),
            result.message
        ),
        Outcome::Failure => {
            error!("Command failed: {}", result.message);
            eprintln!("{} {}", "Error:".red().bold(), result.message);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli_args = CliArgs::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            let result = PipelineResult::failure(Stage::Preflight, e, vec![]);
            eprintln!("{} {}", "Error:".red().bold(), result.message);
            process::exit(result.exit_code());
        }
    };
    init_logging(&config, cli_args.verbose);

    let result = cli_args.command.run(&config).await;
    report(&result);

    if !result.is_success() {
        process::exit(result.exit_code());
    }
    debug!("Command completed successfully.");
}
