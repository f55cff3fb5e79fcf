//! In-memory collaborators recording every call
//!
//! Failures are injected per container path (or `path@label` for destroys),
//! so a test can break exactly one node of the tree.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use zync::backends::{
    ArchiveBackend, ArchiveRequest, ArchiveStats, Created, Notifier, StorageBackend,
    TransferBackend, TransferFailed, TransferRequest, TransferStats,
};

#[derive(Default)]
struct StorageState {
    containers: BTreeSet<String>,
    snapshots: BTreeMap<String, Vec<String>>,
    unreachable: BTreeSet<String>,
    failing_create: BTreeSet<String>,
    failing_chown: BTreeSet<String>,
    failing_snapshot: BTreeSet<String>,
    failing_list: BTreeSet<String>,
    failing_destroy: BTreeSet<String>,
    created: Vec<String>,
    destroyed: Vec<String>,
}

#[derive(Default)]
pub struct MockStorage {
    state: Mutex<StorageState>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_containers<I, S>(self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state
            .lock()
            .unwrap()
            .containers
            .extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_snapshots(self, path: &str, labels: &[&str]) -> Self {
        self.state.lock().unwrap().snapshots.insert(
            path.to_string(),
            labels.iter().map(|label| label.to_string()).collect(),
        );
        self
    }

    pub fn unreachable(self, path: &str) -> Self {
        self.state.lock().unwrap().unreachable.insert(path.to_string());
        self
    }

    pub fn fail_create(self, path: &str) -> Self {
        self.state.lock().unwrap().failing_create.insert(path.to_string());
        self
    }

    /// Create succeeds but the owner hand-off does not.
    pub fn fail_chown(self, path: &str) -> Self {
        self.state.lock().unwrap().failing_chown.insert(path.to_string());
        self
    }

    pub fn fail_snapshot(self, path: &str) -> Self {
        self.state.lock().unwrap().failing_snapshot.insert(path.to_string());
        self
    }

    pub fn fail_list(self, path: &str) -> Self {
        self.state.lock().unwrap().failing_list.insert(path.to_string());
        self
    }

    pub fn fail_destroy(self, path: &str, label: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_destroy
            .insert(format!("{}@{}", path, label));
        self
    }

    pub fn created(&self) -> Vec<String> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn destroyed(&self) -> Vec<String> {
        self.state.lock().unwrap().destroyed.clone()
    }

    pub fn snapshots_of(&self, path: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .snapshots
            .get(path)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl StorageBackend for MockStorage {
    async fn exists(&self, path: &str) -> Result<bool> {
        let state = self.state.lock().unwrap();
        if state.unreachable.contains(path) {
            return Err(anyhow!("cannot open '{}': I/O error", path));
        }
        Ok(state.containers.contains(path))
    }

    async fn create(&self, path: &str) -> Result<Created> {
        let mut state = self.state.lock().unwrap();
        if state.failing_create.contains(path) {
            return Err(anyhow!("cannot create '{}': permission denied", path));
        }
        state.containers.insert(path.to_string());
        state.created.push(path.to_string());
        if state.failing_chown.contains(path) {
            return Ok(Created::OwnerNotSet("chown exited with code 1".to_string()));
        }
        Ok(Created::Ready)
    }

    async fn create_snapshot(&self, path: &str, label: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_snapshot.contains(path) {
            return Err(anyhow!("cannot create snapshot '{}@{}': out of space", path, label));
        }
        state
            .snapshots
            .entry(path.to_string())
            .or_default()
            .push(label.to_string());
        Ok(())
    }

    async fn list_snapshots(&self, path: &str) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        if state.failing_list.contains(path) {
            return Err(anyhow!("cannot list snapshots of '{}'", path));
        }
        Ok(state.snapshots.get(path).cloned().unwrap_or_default())
    }

    async fn destroy_snapshot(&self, path: &str, label: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let name = format!("{}@{}", path, label);
        if state.failing_destroy.contains(&name) {
            return Err(anyhow!("cannot destroy '{}': dataset is busy", name));
        }
        if let Some(labels) = state.snapshots.get_mut(path) {
            labels.retain(|existing| existing != label);
        }
        state.destroyed.push(name);
        Ok(())
    }
}

pub struct MockTransfer {
    requests: Mutex<Vec<TransferRequest>>,
    failing: BTreeSet<PathBuf>,
    stats: TransferStats,
}

impl MockTransfer {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            failing: BTreeSet::new(),
            stats: TransferStats {
                files_total: Some(1_200),
                files_transferred: Some(15),
                bytes_total: Some(10_485_760),
                bytes_transferred: Some(2_048),
                elapsed: Duration::from_secs(90),
            },
        }
    }

    pub fn fail_for(mut self, local_path: impl Into<PathBuf>) -> Self {
        self.failing.insert(local_path.into());
        self
    }

    pub fn requests(&self) -> Vec<TransferRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockTransfer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransferBackend for MockTransfer {
    async fn transfer(&self, request: &TransferRequest) -> Result<TransferStats> {
        self.requests.lock().unwrap().push(request.clone());
        if self.failing.contains(&request.local_path) {
            return Err(TransferFailed {
                stats: TransferStats {
                    files_total: Some(1_200),
                    files_transferred: Some(7),
                    bytes_total: Some(10_485_760),
                    bytes_transferred: None,
                    elapsed: Duration::from_secs(240),
                },
                reason: "rsync exited with code 23\nrsync error: some files could not be transferred"
                    .to_string(),
            }
            .into());
        }
        Ok(self.stats.clone())
    }
}

pub struct MockArchiver {
    archives: Mutex<Vec<ArchiveRequest>>,
    failing: BTreeSet<PathBuf>,
    size_bytes: Option<u64>,
}

impl MockArchiver {
    pub fn new() -> Self {
        Self {
            archives: Mutex::new(Vec::new()),
            failing: BTreeSet::new(),
            size_bytes: Some(5_242_880),
        }
    }

    pub fn fail_for(mut self, source: impl Into<PathBuf>) -> Self {
        self.failing.insert(source.into());
        self
    }

    pub fn without_size(mut self) -> Self {
        self.size_bytes = None;
        self
    }

    pub fn archives(&self) -> Vec<ArchiveRequest> {
        self.archives.lock().unwrap().clone()
    }
}

impl Default for MockArchiver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArchiveBackend for MockArchiver {
    async fn archive(&self, request: &ArchiveRequest) -> Result<ArchiveStats> {
        self.archives.lock().unwrap().push(request.clone());
        if self.failing.contains(&request.source) {
            return Err(anyhow!("zip exited with code 18"));
        }
        Ok(ArchiveStats {
            size_bytes: self.size_bytes,
            elapsed: Duration::from_secs(30),
        })
    }
}

/// Captures every message; clones share the same inbox.
#[derive(Clone, Default)]
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    fail: bool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent().into_iter().map(|(subject, _)| subject).collect()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        if self.fail {
            return Err(anyhow!("mail transport unavailable"));
        }
        Ok(())
    }
}
