use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::{operation_failed, require_root};
use crate::backends::{Created, StorageBackend};
use crate::config::{ConfigTree, Directory, Group, Server};
use crate::constants::report::CELL_ERROR;
use crate::engine::{LevelOperations, NodePath, OperationOutcome};
use crate::errors::{ConfigError, NodeError};

/// Verify that every Group, Server and Directory has its dataset.
pub struct CheckTask {
    tree: Arc<ConfigTree>,
    storage: Arc<dyn StorageBackend>,
    create: bool,
}

impl CheckTask {
    pub fn new(tree: Arc<ConfigTree>, storage: Arc<dyn StorageBackend>, create: bool) -> Self {
        Self {
            tree,
            storage,
            create,
        }
    }

    async fn ensure(&self, path: &NodePath, dataset: &str) -> OperationOutcome {
        match self.storage.exists(dataset).await {
            Ok(true) => OperationOutcome::ok().with_cells(["OK"]),
            Ok(false) if !self.create => OperationOutcome::warning(
                NodeError::Connectivity {
                    path: path.to_string(),
                    reason: format!("dataset '{}' not exist", dataset),
                }
                .to_string(),
            )
            .with_cells(["MISSING"]),
            Ok(false) => match self.storage.create(dataset).await {
                Ok(Created::Ready) => {
                    info!("{}: created {}", path, dataset);
                    OperationOutcome::ok_with(format!("created {}", dataset)).with_cells(["CREATED"])
                }
                // The dataset exists, so its children can still be created
                Ok(Created::OwnerNotSet(reason)) => {
                    OperationOutcome::warning(operation_failed(path, "chown", reason))
                        .proceed()
                        .with_cells(["CREATED"])
                }
                Err(e) => OperationOutcome::error(operation_failed(path, "create", e))
                    .with_cells([CELL_ERROR]),
            },
            Err(e) => {
                OperationOutcome::error(operation_failed(path, "check", e)).with_cells([CELL_ERROR])
            }
        }
    }
}

#[async_trait]
impl LevelOperations for CheckTask {
    async fn visit_root(&self, tree: &ConfigTree) -> Result<(), ConfigError> {
        require_root(self.storage.as_ref(), &tree.settings().zfs_path).await
    }

    async fn visit_group(&self, path: &NodePath, group: &Group) -> OperationOutcome {
        self.ensure(path, &self.tree.group_dataset(group)).await
    }

    async fn visit_server(
        &self,
        path: &NodePath,
        group: &Group,
        server: &Server,
    ) -> OperationOutcome {
        self.ensure(path, &self.tree.server_dataset(group, server)).await
    }

    async fn visit_directory(
        &self,
        path: &NodePath,
        _group: &Group,
        _server: &Server,
        dir: &Directory,
    ) -> OperationOutcome {
        self.ensure(path, &dir.dataset).await
    }
}
