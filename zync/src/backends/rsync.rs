//! Remote transfer through `rsync`, with figures read from its `--stats` output

use anyhow::Result;
use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, info};

use super::commands::run_command;
use super::{TransferBackend, TransferFailed, TransferRequest, TransferStats};

pub struct RsyncTransfer {
    program: String,
}

impl RsyncTransfer {
    pub fn new() -> Self {
        Self {
            program: "rsync".to_string(),
        }
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for RsyncTransfer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransferBackend for RsyncTransfer {
    async fn transfer(&self, request: &TransferRequest) -> Result<TransferStats> {
        info!(
            "Transferring into {} with {} args",
            request.local_path.display(),
            request.program_args.len()
        );
        debug!("{} {}", self.program, request.program_args.join(" "));

        let started = Instant::now();
        let output = run_command(&self.program, &request.program_args).await?;
        let mut stats = parse_stats(&output.stdout);
        stats.elapsed = started.elapsed();

        // Codes 23 and 24 are partial transfers that still print --stats
        if !output.success {
            return Err(TransferFailed {
                stats,
                reason: format!(
                    "{} exited with code {}\n{}",
                    self.program,
                    output.exit_code,
                    output.combined().trim_end()
                ),
            }
            .into());
        }

        Ok(stats)
    }
}

/// Read the summary lines printed by `rsync --stats`.
pub fn parse_stats(output: &str) -> TransferStats {
    let mut stats = TransferStats::default();

    for line in output.lines() {
        let line = line.trim();
        if line.starts_with("Number of files:") {
            stats.files_total = stat_value(line);
        } else if line.starts_with("Number of regular files transferred:")
            || line.starts_with("Number of files transferred:")
        {
            stats.files_transferred = stat_value(line);
        } else if line.starts_with("Total file size:") {
            stats.bytes_total = stat_value(line);
        } else if line.starts_with("Total transferred file size:") {
            stats.bytes_transferred = stat_value(line);
        }
    }

    stats
}

/// First token after the colon, thousands separators removed
fn stat_value(line: &str) -> Option<u64> {
    let (_, value) = line.split_once(':')?;
    let token = value.split_whitespace().next()?;
    token.replace(',', "").parse().ok()
}
