use anyhow::{anyhow, Result};
use std::ffi::OsStr;
use std::process::Stdio;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// stdout followed by stderr, the way a terminal would show them
    pub fn combined(&self) -> String {
        let mut output = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !output.is_empty() && !output.ends_with('\n') {
                output.push('\n');
            }
            output.push_str(&self.stderr);
        }
        output
    }
}

/// Run a program to completion. Fails only when it cannot be spawned.
pub async fn run_command<I, S>(program: &str, args: I) -> Result<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = AsyncCommand::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!("Executing command: {:?}", command.as_std());

    let output = command
        .output()
        .await
        .map_err(|e| anyhow!("Failed to spawn {}: {}", program, e))?;

    Ok(CommandOutput {
        success: output.status.success(),
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Run a program and return its stdout, failing on a non-zero exit.
pub async fn execute_command<I, S>(program: &str, args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = run_command(program, args).await?;

    if output.success {
        Ok(output.stdout)
    } else {
        let error_msg = if !output.stderr.trim().is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        Err(anyhow!(
            "{} exited with code {}: {}",
            program,
            output.exit_code,
            error_msg.trim()
        ))
    }
}
