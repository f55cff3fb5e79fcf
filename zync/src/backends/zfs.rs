//! ZFS datasets as containers, via the `zfs` command

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::{info, instrument, warn};

use super::commands::{execute_command, run_command};
use super::{Created, StorageBackend};
use crate::constants::commands::ZFS_MISSING_DATASET;

const ZFS: &str = "zfs";

pub struct ZfsStorage {
    /// Owner given to the mountpoint of newly created datasets
    owner: Option<String>,
}

impl ZfsStorage {
    pub fn new(owner: Option<String>) -> Self {
        Self { owner }
    }

    async fn mountpoint(&self, path: &str) -> Result<String> {
        let output = execute_command(ZFS, ["get", "-H", "-o", "value", "mountpoint", path]).await?;
        Ok(output.trim().to_string())
    }

    /// `chown` the mountpoint of `path`; returns the mountpoint.
    async fn hand_over(&self, path: &str, owner: &str) -> Result<String> {
        let mountpoint = self.mountpoint(path).await?;
        execute_command("chown", [owner, mountpoint.as_str()]).await?;
        Ok(mountpoint)
    }
}

#[async_trait]
impl StorageBackend for ZfsStorage {
    async fn exists(&self, path: &str) -> Result<bool> {
        let output = run_command(ZFS, ["list", "-H", "-o", "name", path]).await?;
        if output.success {
            return Ok(true);
        }
        if output.stderr.contains(ZFS_MISSING_DATASET) {
            return Ok(false);
        }
        Err(anyhow!("zfs list '{}': {}", path, output.combined().trim()))
    }

    #[instrument(skip(self))]
    async fn create(&self, path: &str) -> Result<Created> {
        execute_command(ZFS, ["create", path]).await?;

        let Some(owner) = &self.owner else {
            info!("Created dataset {}", path);
            return Ok(Created::Ready);
        };

        match self.hand_over(path, owner).await {
            Ok(mountpoint) => {
                info!("Created dataset {} mounted at {} for {}", path, mountpoint, owner);
                Ok(Created::Ready)
            }
            Err(e) => {
                warn!("Created dataset {} but could not hand it to {}: {:#}", path, owner, e);
                Ok(Created::OwnerNotSet(format!("{:#}", e)))
            }
        }
    }

    async fn create_snapshot(&self, path: &str, label: &str) -> Result<()> {
        execute_command(ZFS, ["snapshot".to_string(), format!("{}@{}", path, label)]).await?;
        Ok(())
    }

    async fn list_snapshots(&self, path: &str) -> Result<Vec<String>> {
        let output = execute_command(
            ZFS,
            ["list", "-H", "-t", "snapshot", "-o", "name", "-d", "1", path],
        )
        .await?;
        Ok(parse_snapshot_names(path, &output))
    }

    async fn destroy_snapshot(&self, path: &str, label: &str) -> Result<()> {
        execute_command(ZFS, ["destroy".to_string(), format!("{}@{}", path, label)]).await?;
        Ok(())
    }
}

/// `pool/ds@label` lines of `path` → labels
fn parse_snapshot_names(path: &str, output: &str) -> Vec<String> {
    let prefix = format!("{}@", path);
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix(&prefix))
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}
