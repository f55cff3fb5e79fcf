use anyhow::Result;
use clap::{Parser, Subcommand};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

use zync::config::NotifyConfig;
use zync::constants::{defaults, APP_NAME};
use zync::tasks::{resolve_hostname, today};
use zync::{Backends, ConfigManager, NotificationService, RunKind, TaskRunner};

#[derive(Parser)]
#[command(
    name = "zync",
    version,
    about = "Backup fleet maintenance: containers, transfers, snapshots and archives"
)]
struct Cli {
    /// Directory holding main.toml and one <group>.toml per group
    #[arg(long, env = "ZYNC_CONFIG_DIR", default_value = defaults::CONFIG_DIR)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify the dataset of every group, server and directory
    Check {
        /// Create missing datasets instead of reporting them
        #[arg(long)]
        create: bool,
    },
    /// Pull the directories of one group from its servers
    Sync {
        #[arg(short, long)]
        group: String,
    },
    /// Snapshot every directory and prune expired snapshots
    Snap,
    /// Pack the directories of one group into zip files
    Zip {
        #[arg(short, long)]
        group: String,
    },
}

impl From<Commands> for RunKind {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Check { create } => RunKind::Check { create },
            Commands::Sync { group } => RunKind::Sync { group },
            Commands::Snap => RunKind::Snap,
            Commands::Zip { group } => RunKind::Zip { group },
        }
    }
}

/// Append-mode `<log_dir>/zync.log`, when a log directory is configured
fn open_log_file(log_dir: Option<&Path>) -> Result<Option<File>> {
    let Some(dir) = log_dir else {
        return Ok(None);
    };
    fs::create_dir_all(dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(format!("{}.log", APP_NAME)))?;
    Ok(Some(file))
}

fn init_logging(log_file: Option<File>) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}=info", APP_NAME)));

    match log_file {
        Some(file) => fmt()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .with_writer(std::io::stdout.and(Arc::new(file)))
            .init(),
        None => fmt().with_env_filter(env_filter).init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let kind = RunKind::from(cli.command);
    let run_id = Uuid::new_v4().to_string();

    let loaded = ConfigManager::new(&cli.config_dir).await;
    let log_dir = loaded
        .as_ref()
        .ok()
        .map(|manager| manager.get_current_config().settings().log_path.clone());

    let (log_file, log_error) = match open_log_file(log_dir.as_deref()) {
        Ok(file) => (file, None),
        Err(e) => (None, Some(e)),
    };
    init_logging(log_file);
    if let Some(e) = log_error {
        warn!("Log file unavailable, logging to stdout only: {:#}", e);
    }

    let config_manager = match loaded {
        Ok(manager) => manager,
        Err(e) => {
            // No configuration, so no hostname override or recipients either
            error!("Exit with fatal error: {}", e);
            NotificationService::from_config(&NotifyConfig::default())
                .notify(&kind.fatal_subject(&resolve_hostname(None)), &e.to_string())
                .await;
            return ExitCode::FAILURE;
        }
    };

    let tree = config_manager.get_current_config();
    let settings = tree.settings();
    info!("Starting {} {} (run {})", APP_NAME, kind, run_id);

    let runner = TaskRunner::new(
        kind,
        tree.clone(),
        Backends::system(settings),
        NotificationService::from_config(&settings.notify),
        run_id,
    );

    match runner.run(today(settings.timezone)).await {
        Ok(report) => {
            info!(
                "Finished: {} errors, {} warnings, {} tasks",
                report.totals.errors, report.totals.warnings, report.totals.total_tasks
            );
            ExitCode::SUCCESS
        }
        Err(_) => ExitCode::FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_log_file() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("log");

        assert!(open_log_file(None).unwrap().is_none());
        assert!(open_log_file(Some(&log_dir)).unwrap().is_some());
        assert!(log_dir.join("zync.log").exists());
    }

    #[test]
    fn test_log_dir_blocked_by_a_file_fails_to_open() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("log");
        fs::write(&blocker, "not a directory").unwrap();

        assert!(open_log_file(Some(&blocker)).is_err());
    }
}
