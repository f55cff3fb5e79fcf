use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::{operation_failed, require_container, require_root};
use crate::backends::{ArchiveBackend, ArchiveRequest, StorageBackend};
use crate::config::{ConfigTree, Directory, Group, Server};
use crate::constants::report::{CELL_ERROR, CELL_SKIP, CELL_UNKNOWN};
use crate::engine::{LevelOperations, NodePath, OperationOutcome, OutcomeMetrics};
use crate::errors::ConfigError;
use crate::report::{format_kb, format_minutes};

/// Pack every opted-in Directory of one group into a dated zip file.
pub struct ZipTask {
    tree: Arc<ConfigTree>,
    storage: Arc<dyn StorageBackend>,
    archiver: Arc<dyn ArchiveBackend>,
    zip_path: PathBuf,
    date_stamp: String,
}

impl ZipTask {
    pub fn new(
        tree: Arc<ConfigTree>,
        storage: Arc<dyn StorageBackend>,
        archiver: Arc<dyn ArchiveBackend>,
        today: NaiveDate,
    ) -> Result<Self, ConfigError> {
        let zip_path = tree
            .settings()
            .zip_path
            .clone()
            .ok_or_else(|| ConfigError::MissingRequired {
                field: "zip_path".to_string(),
            })?;

        Ok(Self {
            tree,
            storage,
            archiver,
            zip_path,
            date_stamp: today.format("%Y%m%d").to_string(),
        })
    }

    /// `<zip_path>/<group>_<server>_<dir>_<YYYYMMDD>.zip`
    pub fn destination(&self, path: &NodePath) -> PathBuf {
        self.zip_path
            .join(format!("{}_{}.zip", path.joined("_"), self.date_stamp))
    }
}

#[async_trait]
impl LevelOperations for ZipTask {
    async fn visit_root(&self, tree: &ConfigTree) -> Result<(), ConfigError> {
        require_root(self.storage.as_ref(), &self.zip_path.display().to_string()).await?;
        for group in tree.groups() {
            require_root(self.storage.as_ref(), &tree.group_dir(group).display().to_string())
                .await?;
        }
        Ok(())
    }

    async fn visit_group(&self, _path: &NodePath, _group: &Group) -> OperationOutcome {
        OperationOutcome::ok()
    }

    async fn visit_server(
        &self,
        path: &NodePath,
        group: &Group,
        server: &Server,
    ) -> OperationOutcome {
        let server_dir = self.tree.server_dir(group, server);
        require_container(self.storage.as_ref(), path, &server_dir.display().to_string())
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
        if let Some(missing) = require_container(
            self.storage.as_ref(),
            path,
            &dir.local_path.display().to_string(),
        )
        .await
        {
            return missing.with_cells([CELL_ERROR, CELL_ERROR]);
        }

        if !dir.pack_to_zip {
            return OperationOutcome::skipped("packtozip = false")
                .with_cells([CELL_SKIP, "0.00"]);
        }

        let destination = self.destination(path);
        info!("zip dir '{}' to {}", path, destination.display());

        let request = ArchiveRequest {
            source: dir.local_path.clone(),
            destination: destination.clone(),
            log_name: path.joined("-"),
        };

        match self.archiver.archive(&request).await {
            Ok(stats) => {
                let minutes = format_minutes(stats.elapsed);
                let metrics = OutcomeMetrics {
                    files: None,
                    bytes: stats.size_bytes,
                    duration: Some(stats.elapsed),
                };
                match stats.size_bytes {
                    Some(size) => OperationOutcome::ok()
                        .with_cells([format_kb(size), minutes])
                        .with_metrics(metrics),
                    None => OperationOutcome::warning(format!(
                        "error stat '{}'",
                        destination.display()
                    ))
                    .with_cells([CELL_UNKNOWN.to_string(), minutes])
                    .with_metrics(metrics),
                }
            }
            Err(e) => OperationOutcome::error(operation_failed(path, "zip", format!("{:#}", e)))
                .with_cells([CELL_UNKNOWN, CELL_UNKNOWN]),
        }
    }
}
