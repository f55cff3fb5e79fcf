//! Plain directories as containers, for the transfer and archive runs

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use tokio::fs;

use super::{Created, StorageBackend};

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDirStorage;

impl LocalDirStorage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StorageBackend for LocalDirStorage {
    async fn exists(&self, path: &str) -> Result<bool> {
        match fs::metadata(path).await {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(anyhow!("stat '{}': {}", path, e)),
        }
    }

    async fn create(&self, path: &str) -> Result<Created> {
        fs::create_dir_all(path)
            .await
            .map_err(|e| anyhow!("mkdir '{}': {}", path, e))?;
        Ok(Created::Ready)
    }

    async fn create_snapshot(&self, path: &str, _label: &str) -> Result<()> {
        Err(anyhow!("'{}' is a plain directory, snapshots are not supported", path))
    }

    async fn list_snapshots(&self, path: &str) -> Result<Vec<String>> {
        Err(anyhow!("'{}' is a plain directory, snapshots are not supported", path))
    }

    async fn destroy_snapshot(&self, path: &str, _label: &str) -> Result<()> {
        Err(anyhow!("'{}' is a plain directory, snapshots are not supported", path))
    }
}
