//! Remote-to-local transfer of every Directory of one group

use async_trait::async_trait;
use handlebars::Handlebars;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::{operation_failed, require_container, require_root};
use crate::backends::{
    StorageBackend, TransferBackend, TransferFailed, TransferRequest, TransferStats,
};
use crate::config::{ConfigTree, Directory, Group, Server};
use crate::constants::report::{CELL_SKIP, CELL_UNKNOWN};
use crate::engine::{LevelOperations, NodePath, OperationOutcome, OutcomeMetrics};
use crate::errors::{ConfigError, NodeError};
use crate::report::{format_kb, format_minutes};

/// Values available to the `rsync_args` templates
#[derive(Debug, Serialize)]
struct TransferParams<'a> {
    host: &'a str,
    port: u16,
    ssh_user: &'a str,
    remote_path: &'a str,
    local_path: String,
    log_path: String,
    config_dir: String,
}

pub struct SyncTask {
    tree: Arc<ConfigTree>,
    storage: Arc<dyn StorageBackend>,
    transfer: Arc<dyn TransferBackend>,
    templates: Handlebars<'static>,
}

impl SyncTask {
    /// Compile the argument templates of every group type in `tree`.
    pub fn new(
        tree: Arc<ConfigTree>,
        storage: Arc<dyn StorageBackend>,
        transfer: Arc<dyn TransferBackend>,
    ) -> Result<Self, ConfigError> {
        let mut templates = Handlebars::new();
        templates.set_strict_mode(true);
        templates.register_escape_fn(handlebars::no_escape);

        for group in tree.groups() {
            let args = Self::template_args(&tree, &group.group_type)?;
            for (index, arg) in args.iter().enumerate() {
                templates
                    .register_template_string(&template_name(&group.group_type, index), arg)
                    .map_err(|e| ConfigError::InvalidValue {
                        field: format!("rsync_args.{}", group.group_type),
                        reason: e.to_string(),
                    })?;
            }
        }

        Ok(Self {
            tree,
            storage,
            transfer,
            templates,
        })
    }

    fn template_args<'a>(tree: &'a ConfigTree, group_type: &str) -> Result<&'a [String], ConfigError> {
        match tree.settings().rsync_args.get(group_type) {
            Some(args) if !args.is_empty() => Ok(args.as_slice()),
            _ => Err(ConfigError::MissingRequired {
                field: format!("rsync_args.{}", group_type),
            }),
        }
    }

    fn render_args(&self, group: &Group, params: &TransferParams<'_>) -> Result<Vec<String>, String> {
        let count = self
            .tree
            .settings()
            .rsync_args
            .get(&group.group_type)
            .map_or(0, Vec::len);

        let mut args = Vec::with_capacity(count);
        for index in 0..count {
            let arg = self
                .templates
                .render(&template_name(&group.group_type, index), params)
                .map_err(|e| e.to_string())?;
            if !arg.trim().is_empty() {
                args.push(arg);
            }
        }
        Ok(args)
    }

    fn transfer_user<'a>(&'a self, server: &'a Server) -> Option<&'a str> {
        server
            .ssh_user
            .as_deref()
            .or(self.tree.settings().ssh_user.as_deref())
    }
}

fn template_name(group_type: &str, index: usize) -> String {
    format!("{}.{}", group_type, index)
}

fn count_cell(value: Option<u64>) -> String {
    value.map_or_else(|| CELL_UNKNOWN.to_string(), |v| v.to_string())
}

fn size_cell(value: Option<u64>) -> String {
    value.map_or_else(|| CELL_UNKNOWN.to_string(), format_kb)
}

fn stats_cells(stats: &TransferStats) -> [String; 3] {
    [
        format!(
            "{:>7} / {:>7}",
            count_cell(stats.files_transferred),
            count_cell(stats.files_total)
        ),
        format!(
            "{:>13} / {:>13}",
            size_cell(stats.bytes_transferred),
            size_cell(stats.bytes_total)
        ),
        format_minutes(stats.elapsed),
    ]
}

fn transfer_metrics(stats: &TransferStats) -> OutcomeMetrics {
    OutcomeMetrics {
        files: stats.files_transferred,
        bytes: stats.bytes_transferred,
        duration: Some(stats.elapsed),
    }
}

#[async_trait]
impl LevelOperations for SyncTask {
    async fn visit_root(&self, tree: &ConfigTree) -> Result<(), ConfigError> {
        for group in tree.groups() {
            require_root(self.storage.as_ref(), &tree.group_dir(group).display().to_string())
                .await?;
        }
        Ok(())
    }

    async fn visit_group(&self, _path: &NodePath, group: &Group) -> OperationOutcome {
        info!("Sync group '{}' of type '{}'", group.name, group.group_type);
        OperationOutcome::ok()
    }

    async fn visit_server(
        &self,
        path: &NodePath,
        group: &Group,
        server: &Server,
    ) -> OperationOutcome {
        let server_dir = self.tree.server_dir(group, server);
        if let Some(missing) =
            require_container(self.storage.as_ref(), path, &server_dir.display().to_string()).await
        {
            return missing;
        }

        if self.transfer_user(server).is_none() {
            return OperationOutcome::warning(
                NodeError::Connectivity {
                    path: path.to_string(),
                    reason: "ssh user not found in config".to_string(),
                }
                .to_string(),
            );
        }

        info!("Sync server '{}' ({}:{})", path, server.host, server.port);
        OperationOutcome::ok()
    }

    async fn visit_directory(
        &self,
        path: &NodePath,
        group: &Group,
        server: &Server,
        dir: &Directory,
    ) -> OperationOutcome {
        let skipped_cells = [CELL_SKIP, CELL_SKIP, CELL_SKIP];

        if let Some(missing) = require_container(
            self.storage.as_ref(),
            path,
            &dir.local_path.display().to_string(),
        )
        .await
        {
            return missing.with_cells(skipped_cells);
        }

        let settings = self.tree.settings();
        let params = TransferParams {
            host: &server.host,
            port: server.port,
            ssh_user: self.transfer_user(server).unwrap_or_default(),
            remote_path: &dir.remote_path,
            local_path: dir.local_path.display().to_string(),
            log_path: settings
                .log_path
                .join(format!("{}.log", path.joined("-")))
                .display()
                .to_string(),
            config_dir: settings.config_dir.display().to_string(),
        };

        let program_args = match self.render_args(group, &params) {
            Ok(args) => args,
            Err(e) => {
                return OperationOutcome::warning(format!("template error '{}'", e))
                    .with_cells(skipped_cells)
            }
        };
        debug!("rsync {}", program_args.join(" "));

        let request = TransferRequest {
            program_args,
            local_path: dir.local_path.clone(),
        };

        match self.transfer.transfer(&request).await {
            Ok(stats) => OperationOutcome::ok()
                .with_cells(stats_cells(&stats))
                .with_metrics(transfer_metrics(&stats)),
            Err(e) => {
                let failed =
                    OperationOutcome::error(operation_failed(path, "rsync", format!("{:#}", e)));
                match e.downcast_ref::<TransferFailed>() {
                    Some(partial) => failed
                        .with_cells(stats_cells(&partial.stats))
                        .with_metrics(transfer_metrics(&partial.stats)),
                    None => {
                        let [files, size, _] = stats_cells(&TransferStats::default());
                        failed.with_cells([files, size, CELL_UNKNOWN.to_string()])
                    }
                }
            }
        }
    }
}
