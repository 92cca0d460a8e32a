// swcrv-aio/src/process.rs
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Output as StdOutput, Stdio};
use std::sync::Arc;
use std::time::Duration;

use swcrv_common::error::{Result, SwcrvError};
use tokio::process::Command;
use tracing::{debug, error};

/// Runs an external command, captures its output and kills it once `timeout`
/// elapses.
pub async fn run_command_async(
    command: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    envs: Option<HashMap<String, String>>,
    timeout: Duration,
) -> Result<StdOutput> {
    debug!(
        "Running command: {} {:?} (cwd: {:?}, envs: {:?}, timeout: {:?})",
        command,
        args,
        cwd,
        envs.as_ref().map(|e| e.keys().collect::<Vec<_>>()),
        timeout
    );

    let mut cmd = Command::new(&command);
    cmd.args(args);
    cmd.kill_on_drop(true);

    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    if let Some(env_map) = envs {
        cmd.envs(env_map);
    }

    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.stdin(Stdio::null());

    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => {
            if !output.status.success() {
                debug!("Command failed with status: {}", output.status);
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !stdout.trim().is_empty() {
                    debug!("Stdout:\n{}", stdout.trim());
                }
                if !stderr.trim().is_empty() {
                    debug!("Stderr:\n{}", stderr.trim());
                }
            } else {
                debug!("Command finished successfully.");
            }
            Ok(output)
        }
        Ok(Err(e)) => {
            error!("Failed to execute command {}: {}", command, e);
            Err(SwcrvError::Io(Arc::new(e)))
        }
        Err(_) => {
            error!("Command {} timed out after {:?}", command, timeout);
            Err(SwcrvError::IoError(format!(
                "'{command}' did not finish within {}s",
                timeout.as_secs()
            )))
        }
    }
}

/// Runs a long external command with inherited stdio so its progress stays
/// visible. No timeout.
pub async fn run_command_streaming(
    command: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
) -> Result<ExitStatus> {
    debug!("Running command (streaming): {} {:?} (cwd: {:?})", command, args, cwd);
    let mut cmd = Command::new(&command);
    cmd.args(args);
    cmd.kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    cmd.stdin(Stdio::null());

    cmd.status().await.map_err(|e| {
        error!("Failed to execute command {}: {}", command, e);
        SwcrvError::Io(Arc::new(e))
    })
}
