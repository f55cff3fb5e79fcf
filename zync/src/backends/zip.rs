use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Instant;
use tokio::fs;
use tracing::{info, warn};

use super::commands::run_command;
use super::{ArchiveBackend, ArchiveRequest, ArchiveStats};

pub struct ZipArchiver {
    program: String,
    /// Directory for the per-archive `zip -lf` log files
    log_dir: Option<PathBuf>,
}

impl ZipArchiver {
    pub fn new(log_dir: Option<PathBuf>) -> Self {
        Self {
            program: "zip".to_string(),
            log_dir,
        }
    }

    /// `<log_dir>/zip-<group>-<server>-<dir>.log`
    fn log_file(&self, log_name: &str) -> Option<PathBuf> {
        self.log_dir
            .as_ref()
            .map(|dir| dir.join(format!("zip-{}.log", log_name)))
    }
}

#[async_trait]
impl ArchiveBackend for ZipArchiver {
    async fn archive(&self, request: &ArchiveRequest) -> Result<ArchiveStats> {
        let ArchiveRequest {
            source,
            destination,
            log_name,
        } = request;

        let mut args = vec!["-r".to_string()];
        if let Some(log_file) = self.log_file(log_name) {
            args.push("-lf".to_string());
            args.push(log_file.display().to_string());
        }
        args.push(destination.display().to_string());
        args.push(source.display().to_string());

        info!("Archiving {} to {}", source.display(), destination.display());

        let started = Instant::now();
        let output = run_command(&self.program, &args).await?;
        let elapsed = started.elapsed();

        if !output.success {
            return Err(anyhow!(
                "{} exited with code {}\n{}",
                self.program,
                output.exit_code,
                output.combined().trim_end()
            ));
        }

        let size_bytes = match fs::metadata(destination).await {
            Ok(metadata) => Some(metadata.len()),
            Err(e) => {
                warn!("error stat '{}': {}", destination.display(), e);
                None
            }
        };

        Ok(ArchiveStats {
            size_bytes,
            elapsed,
        })
    }
}
