//! The four run kinds and the driver that takes a run from lock to report

pub mod check;
pub mod snap;
pub mod sync;
pub mod zip;

use chrono::{Local, NaiveDate, Utc};
use chrono_tz::Tz;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::{error, info, instrument, warn};

use crate::backends::{
    ArchiveBackend, LocalDirStorage, RsyncTransfer, StorageBackend, TransferBackend, ZfsStorage,
    ZipArchiver,
};
use crate::config::{ConfigTree, Settings};
use crate::constants::APP_NAME;
use crate::engine::{LevelOperations, NodePath, OperationOutcome, TraversalEngine};
use crate::errors::{ConfigError, NodeError, ZyncError};
use crate::report::{Report, ReportAggregator, ReportLayout};
use crate::run_lock::RunLock;
use crate::services::NotificationService;
use crate::snapshot::SnapshotPolicy;

pub use check::CheckTask;
pub use snap::SnapTask;
pub use sync::SyncTask;
pub use zip::ZipTask;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunKind {
    /// Verify containers, creating missing ones when `create` is set
    Check { create: bool },
    Sync { group: String },
    Snap,
    Zip { group: String },
}

impl RunKind {
    pub fn name(&self) -> &'static str {
        match self {
            RunKind::Check { .. } => "check",
            RunKind::Sync { .. } => "sync",
            RunKind::Snap => "snap",
            RunKind::Zip { .. } => "zip",
        }
    }

    pub fn group(&self) -> Option<&str> {
        match self {
            RunKind::Sync { group } | RunKind::Zip { group } => Some(group),
            RunKind::Check { .. } | RunKind::Snap => None,
        }
    }

    pub fn title(&self) -> String {
        format!("{} {}", APP_NAME, self.name())
    }

    /// Scope shown in the report subject
    pub fn scope(&self) -> String {
        self.group().unwrap_or("all").to_string()
    }

    pub fn lock_key(&self) -> String {
        match self.group() {
            Some(group) => format!("{}-{}", self.name(), group),
            None => self.name().to_string(),
        }
    }

    pub fn layout(&self) -> ReportLayout {
        match self {
            RunKind::Check { .. } => ReportLayout::new(24, &[("Container", 9)]),
            RunKind::Sync { .. } => ReportLayout::new(
                24,
                &[
                    ("Files recv/total", 17),
                    ("Size in Kb recv/total", 29),
                    ("Minutes", 7),
                ],
            ),
            RunKind::Snap => ReportLayout::new(24, &[("New", 7), ("Prune", 12)]),
            RunKind::Zip { .. } => ReportLayout::new(24, &[("Size in Kb", 29), ("Minutes", 7)]),
        }
    }

    pub fn fatal_subject(&self, hostname: &str) -> String {
        format!(
            "{} {}/{}: Exit with fatal error",
            self.title(),
            hostname.to_uppercase(),
            self.scope().to_uppercase()
        )
    }

    /// `<log_path>/<kind>[-<group>]-report.log`, one per lock key
    pub fn report_file(&self, settings: &Settings) -> PathBuf {
        settings
            .log_path
            .join(format!("{}-report.log", self.lock_key()))
    }
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.group() {
            Some(group) => write!(f, "{} {}", self.name(), group),
            None => write!(f, "{}", self.name()),
        }
    }
}

/// Collaborators used by the run kinds
#[derive(Clone)]
pub struct Backends {
    /// Snapshot-capable containers (`check`, `snap`)
    pub datasets: Arc<dyn StorageBackend>,
    /// Plain mount directories (`sync`, `zip`)
    pub directories: Arc<dyn StorageBackend>,
    pub transfer: Arc<dyn TransferBackend>,
    pub archive: Arc<dyn ArchiveBackend>,
}

impl Backends {
    /// Shell-backed collaborators for a real run
    pub fn system(settings: &Settings) -> Self {
        Self {
            datasets: Arc::new(ZfsStorage::new(settings.zync_user.clone())),
            directories: Arc::new(LocalDirStorage::new()),
            transfer: Arc::new(RsyncTransfer::new()),
            archive: Arc::new(ZipArchiver::new(Some(settings.log_path.clone()))),
        }
    }
}

pub struct TaskRunner {
    kind: RunKind,
    tree: Arc<ConfigTree>,
    backends: Backends,
    notifications: NotificationService,
    run_id: String,
}

impl TaskRunner {
    pub fn new(
        kind: RunKind,
        tree: Arc<ConfigTree>,
        backends: Backends,
        notifications: NotificationService,
        run_id: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            tree,
            backends,
            notifications,
            run_id: run_id.into(),
        }
    }

    /// Run to completion and deliver the report.
    ///
    /// Only fatal errors are returned; they are notified before returning.
    #[instrument(skip_all, fields(run_id = %self.run_id, kind = %self.kind))]
    pub async fn run(&self, today: NaiveDate) -> Result<Report, ZyncError> {
        let hostname = resolve_hostname(self.tree.settings().hostname.as_deref());

        match self.execute(today, &hostname).await {
            Ok(report) => {
                info!("{}", report.subject);
                self.deliver(&report).await;
                Ok(report)
            }
            Err(e) => {
                error!("Exit with fatal error: {}", e);
                self.notifications
                    .notify(&self.kind.fatal_subject(&hostname), &e.to_string())
                    .await;
                Err(e)
            }
        }
    }

    async fn execute(&self, today: NaiveDate, hostname: &str) -> Result<Report, ZyncError> {
        let settings = self.tree.settings();
        let _lock = RunLock::acquire(&settings.lock_dir, &self.kind.lock_key(), &self.run_id)?;

        let tree = match self.kind.group() {
            Some(group) => Arc::new(self.tree.scoped(group)?),
            None => self.tree.clone(),
        };

        let ops = self.level_operations(tree.clone(), today)?;
        let mut aggregator = ReportAggregator::new(self.kind.title(), self.kind.layout());

        TraversalEngine::walk(&tree, ops.as_ref(), &mut aggregator).await?;

        Ok(aggregator.finalize(hostname, &self.kind.scope()))
    }

    fn level_operations(
        &self,
        tree: Arc<ConfigTree>,
        today: NaiveDate,
    ) -> Result<Box<dyn LevelOperations>, ConfigError> {
        let ops: Box<dyn LevelOperations> = match &self.kind {
            RunKind::Check { create } => Box::new(CheckTask::new(
                tree,
                self.backends.datasets.clone(),
                *create,
            )),
            RunKind::Snap => {
                let policy = SnapshotPolicy::new(today, &tree.settings().retention);
                info!(
                    "Snapshot label {}, cutoff {}",
                    policy.label(),
                    policy
                        .cutoff()
                        .map(|cutoff| cutoff.to_string())
                        .unwrap_or_else(|| "disabled".to_string())
                );
                Box::new(SnapTask::new(tree, self.backends.datasets.clone(), policy))
            }
            RunKind::Sync { .. } => Box::new(SyncTask::new(
                tree,
                self.backends.directories.clone(),
                self.backends.transfer.clone(),
            )?),
            RunKind::Zip { .. } => Box::new(ZipTask::new(
                tree,
                self.backends.directories.clone(),
                self.backends.archive.clone(),
                today,
            )?),
        };
        Ok(ops)
    }

    async fn deliver(&self, report: &Report) {
        let report_file = self.kind.report_file(self.tree.settings());
        if let Err(e) = fs::write(&report_file, report.to_text()).await {
            warn!("Failed to write report {}: {}", report_file.display(), e);
        }

        self.notifications.notify(&report.subject, &report.body).await;
    }
}

/// Current calendar date, in the configured timezone when there is one
pub fn today(timezone: Option<Tz>) -> NaiveDate {
    match timezone {
        Some(tz) => Utc::now().with_timezone(&tz).date_naive(),
        None => Local::now().date_naive(),
    }
}

pub fn resolve_hostname(configured: Option<&str>) -> String {
    if let Some(name) = configured.filter(|name| !name.is_empty()) {
        return name.to_string();
    }
    hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string())
}

/// Root containers must exist; anything else aborts the run.
async fn require_root(storage: &dyn StorageBackend, container: &str) -> Result<(), ConfigError> {
    match storage.exists(container).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(ConfigError::RootUnavailable {
            path: container.to_string(),
            reason: "not exist".to_string(),
        }),
        Err(e) => Err(ConfigError::RootUnavailable {
            path: container.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// `None` when `container` exists, otherwise the Warning that skips the node.
async fn require_container(
    storage: &dyn StorageBackend,
    path: &NodePath,
    container: &str,
) -> Option<OperationOutcome> {
    let reason = match storage.exists(container).await {
        Ok(true) => return None,
        Ok(false) => format!("path '{}' not exist", container),
        Err(e) => e.to_string(),
    };

    Some(OperationOutcome::warning(
        NodeError::Connectivity {
            path: path.to_string(),
            reason,
        }
        .to_string(),
    ))
}

fn operation_failed(path: &NodePath, operation: &str, reason: impl fmt::Display) -> String {
    NodeError::Operation {
        path: path.to_string(),
        operation: operation.to_string(),
        reason: reason.to_string(),
    }
    .to_string()
}
