//! Contracts of the external collaborators and their shell-backed implementations

pub mod commands;
pub mod local;
pub mod rsync;
pub mod zfs;
pub mod zip;

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub use local::LocalDirStorage;
pub use rsync::RsyncTransfer;
pub use zfs::ZfsStorage;
pub use zip::ZipArchiver;

/// A container that now exists, with or without its owner applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Created {
    Ready,
    /// Created, but handing it to its owner failed with the given reason
    OwnerNotSet(String),
}

/// Containers and their point-in-time snapshots
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn exists(&self, path: &str) -> Result<bool>;

    /// `Err` only when the container was not created.
    async fn create(&self, path: &str) -> Result<Created>;

    async fn create_snapshot(&self, path: &str, label: &str) -> Result<()>;

    /// Labels of the snapshots of `path`, without the container prefix
    async fn list_snapshots(&self, path: &str) -> Result<Vec<String>>;

    async fn destroy_snapshot(&self, path: &str, label: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub program_args: Vec<String>,
    pub local_path: PathBuf,
}

/// Figures reported by the transfer program; `None` when absent from its output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferStats {
    pub files_total: Option<u64>,
    pub files_transferred: Option<u64>,
    pub bytes_total: Option<u64>,
    pub bytes_transferred: Option<u64>,
    pub elapsed: Duration,
}

/// A transfer that exited unsuccessfully, with the figures it still printed
#[derive(Debug, Clone)]
pub struct TransferFailed {
    pub stats: TransferStats,
    pub reason: String,
}

impl fmt::Display for TransferFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl std::error::Error for TransferFailed {}

#[async_trait]
pub trait TransferBackend: Send + Sync {
    /// Failed runs return a [`TransferFailed`] when partial figures exist.
    async fn transfer(&self, request: &TransferRequest) -> Result<TransferStats>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArchiveStats {
    /// Size of the archive file, `None` when it could not be determined
    pub size_bytes: Option<u64>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Node name used for the per-archive log file
    pub log_name: String,
}

#[async_trait]
pub trait ArchiveBackend: Send + Sync {
    async fn archive(&self, request: &ArchiveRequest) -> Result<ArchiveStats>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<()>;
}
