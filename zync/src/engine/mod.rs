//! Depth-first Group → Server → Directory traversal with failure containment
//!
//! A failed Group or Server stops descent into its own subtree only; its
//! siblings are still visited. The single fatal path is the root check, which
//! aborts before any node is visited.

pub mod outcome;

use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{ConfigTree, Directory, Group, Server};
use crate::errors::ConfigError;
use crate::report::ReportAggregator;

pub use outcome::{NodePath, OperationOutcome, OutcomeMetrics, OutcomeStatus};

/// One callback per level of the tree.
///
/// Implementations convert every per-node failure into an
/// [`OperationOutcome`]; only [`LevelOperations::visit_root`] may fail the run.
#[async_trait]
pub trait LevelOperations: Send + Sync {
    /// Verify the root container of the run.
    async fn visit_root(&self, tree: &ConfigTree) -> Result<(), ConfigError>;

    async fn visit_group(&self, path: &NodePath, group: &Group) -> OperationOutcome;

    async fn visit_server(&self, path: &NodePath, group: &Group, server: &Server)
        -> OperationOutcome;

    async fn visit_directory(
        &self,
        path: &NodePath,
        group: &Group,
        server: &Server,
        dir: &Directory,
    ) -> OperationOutcome;
}

pub struct TraversalEngine;

impl TraversalEngine {
    /// Visit every node of `tree` once, in name order, feeding `report`.
    #[instrument(skip_all)]
    pub async fn walk<O>(
        tree: &ConfigTree,
        ops: &O,
        report: &mut ReportAggregator,
    ) -> Result<(), ConfigError>
    where
        O: LevelOperations + ?Sized,
    {
        ops.visit_root(tree).await?;

        for group in tree.groups() {
            let group_path = NodePath::group(&group.name);
            let outcome = ops.visit_group(&group_path, group).await;
            if !Self::contain(&group_path, outcome, report) {
                continue;
            }

            for server in &group.servers {
                let server_path = group_path.server(&server.name);
                let outcome = ops.visit_server(&server_path, group, server).await;
                if !Self::contain(&server_path, outcome, report) {
                    continue;
                }

                for dir in &server.dirs {
                    let dir_path = server_path.dir(&dir.name);
                    let outcome = ops.visit_directory(&dir_path, group, server, dir).await;
                    Self::log_leaf(&dir_path, &outcome);
                    report.record_row(&dir_path, outcome);
                }
            }
        }

        Ok(())
    }

    /// Record a Group/Server outcome; returns whether to descend.
    fn contain(path: &NodePath, outcome: OperationOutcome, report: &mut ReportAggregator) -> bool {
        match outcome.status {
            OutcomeStatus::Ok => {
                debug!("{}: OK {}", path, outcome.message);
                true
            }
            OutcomeStatus::Skipped => {
                info!("Skipping '{}': {}", path, outcome.message);
                false
            }
            OutcomeStatus::Warning => {
                warn!("'{}': {}", path, outcome.message);
                report.record_warning(&outcome.message);
                if outcome.should_descend() {
                    return true;
                }
                report.record_subtree_row(path);
                false
            }
            OutcomeStatus::Error => {
                error!("'{}': {}", path, outcome.message);
                report.record_error(&outcome.message);
                report.record_subtree_row(path);
                false
            }
        }
    }

    fn log_leaf(path: &NodePath, outcome: &OperationOutcome) {
        match outcome.status {
            OutcomeStatus::Ok => info!("'{}' = OK {}", path, outcome.message),
            OutcomeStatus::Skipped => info!("'{}' skipped: {}", path, outcome.message),
            OutcomeStatus::Warning => warn!("'{}': {}", path, outcome.message),
            OutcomeStatus::Error => error!("'{}': {}", path, outcome.message),
        }
    }
}
