//! Snapshot creation and retention pruning, per Directory dataset

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{operation_failed, require_container, require_root};
use crate::backends::StorageBackend;
use crate::config::{ConfigTree, Directory, Group, Server};
use crate::constants::report::{CELL_ERROR, CELL_SKIP};
use crate::engine::{LevelOperations, NodePath, OperationOutcome};
use crate::errors::ConfigError;
use crate::snapshot::{PrunePlan, PruneResult, SnapshotPolicy};

pub struct SnapTask {
    tree: Arc<ConfigTree>,
    storage: Arc<dyn StorageBackend>,
    policy: SnapshotPolicy,
}

impl SnapTask {
    pub fn new(tree: Arc<ConfigTree>, storage: Arc<dyn StorageBackend>, policy: SnapshotPolicy) -> Self {
        Self {
            tree,
            storage,
            policy,
        }
    }

    /// Destroy the snapshots of `dataset` older than the cutoff.
    ///
    /// Returns the prune result and one message per failed destroy.
    async fn prune(&self, dataset: &str) -> (PruneResult, Vec<String>) {
        if !self.policy.retention_enabled() {
            return (PruneResult::Disabled, Vec::new());
        }

        let existing = match self.storage.list_snapshots(dataset).await {
            Ok(existing) => existing,
            Err(e) => return (PruneResult::Failed(e.to_string()), Vec::new()),
        };

        let (eligible, matching_total) = match self.policy.plan_pruning(&existing) {
            PrunePlan::Disabled => return (PruneResult::Disabled, Vec::new()),
            PrunePlan::Candidates {
                eligible,
                matching_total,
            } => (eligible, matching_total),
        };

        let mut deleted = 0;
        let mut failures = Vec::new();
        for label in &eligible {
            match self.storage.destroy_snapshot(dataset, label).await {
                Ok(()) => {
                    debug!("destroyed {}@{}", dataset, label);
                    deleted += 1;
                }
                Err(e) => {
                    warn!("destroy {}@{} failed: {}", dataset, label, e);
                    failures.push(format!("{}@{}: {}", dataset, label, e));
                }
            }
        }

        let result = PruneResult::Pruned {
            deleted,
            eligible: eligible.len(),
            matching_total,
        };
        (result, failures)
    }
}

#[async_trait]
impl LevelOperations for SnapTask {
    async fn visit_root(&self, tree: &ConfigTree) -> Result<(), ConfigError> {
        require_root(self.storage.as_ref(), &tree.settings().zfs_path).await
    }

    async fn visit_group(&self, path: &NodePath, group: &Group) -> OperationOutcome {
        require_container(self.storage.as_ref(), path, &self.tree.group_dataset(group))
            .await
            .unwrap_or_else(OperationOutcome::ok)
    }

    async fn visit_server(
        &self,
        path: &NodePath,
        group: &Group,
        server: &Server,
    ) -> OperationOutcome {
        require_container(
            self.storage.as_ref(),
            path,
            &self.tree.server_dataset(group, server),
        )
        .await
        .unwrap_or_else(OperationOutcome::ok)
    }

    async fn visit_directory(
        &self,
        path: &NodePath,
        _group: &Group,
        _server: &Server,
        dir: &Directory,
    ) -> OperationOutcome {
        if let Some(missing) = require_container(self.storage.as_ref(), path, &dir.dataset).await {
            return missing.with_cells([CELL_ERROR, CELL_ERROR]);
        }

        let label = self.policy.label().to_string();
        if let Err(e) = self.storage.create_snapshot(&dir.dataset, &label).await {
            return OperationOutcome::error(operation_failed(path, "snapshot", e))
                .with_cells([CELL_ERROR, CELL_SKIP]);
        }
        info!("SNAP: '{}' = OK {}@{}", path, dir.dataset, label);

        let (prune, failures) = self.prune(&dir.dataset).await;
        let cells = ["OK".to_string(), prune.cell()];

        match &prune {
            PruneResult::Failed(reason) => {
                OperationOutcome::error(operation_failed(path, "list snapshots", reason))
                    .with_cells(cells)
            }
            PruneResult::Pruned {
                deleted, eligible, ..
            } if !failures.is_empty() => OperationOutcome::warning(format!(
                "deleted {} of {} snapshots: {}",
                deleted,
                eligible,
                failures.join("; ")
            ))
            .with_cells(cells),
            _ => OperationOutcome::ok_with(format!("{} prune {}", label, prune.cell()))
                .with_cells(cells),
        }
    }
}
