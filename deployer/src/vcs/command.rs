//! Subprocess execution

use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::errors::{DeployError, DeployResult};

/// Run `program` with `args`, optionally in `dir` and with `stdin` piped in.
///
/// Returns stdout followed by stderr. A non-zero exit status becomes
/// [`DeployError::CommandFailure`] carrying the same combined output.
pub async fn run(
    program: &str,
    args: &[&str],
    dir: Option<&Path>,
    stdin: Option<&str>,
) -> DeployResult<String> {
    run_with_env(program, args, dir, stdin, &[]).await
}

/// Like [`run`], with extra environment variables that are never logged
pub async fn run_with_env(
    program: &str,
    args: &[&str],
    dir: Option<&Path>,
    stdin: Option<&str>,
    envs: &[(String, String)],
) -> DeployResult<String> {
    debug!("{} {}", program, args.join(" "));

    let mut command = Command::new(program);
    command
        .args(args)
        .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = dir {
        command.current_dir(dir);
    }

    let mut child = command
        .spawn()
        .map_err(|e| DeployError::CommandFailure(format!("Failed to run {}: {}", program, e)))?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(input.as_bytes()).await?;
        drop(pipe);
    }

    let output = child.wait_with_output().await?;
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    debug!("{}", combined.trim_end());

    if !output.status.success() {
        return Err(DeployError::CommandFailure(combined));
    }
    Ok(combined)
}
