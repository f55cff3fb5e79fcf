use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// `group`, `group/server` or `group/server/dir`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodePath {
    group: String,
    server: Option<String>,
    dir: Option<String>,
}

impl NodePath {
    pub fn group(group: &str) -> Self {
        Self {
            group: group.to_string(),
            server: None,
            dir: None,
        }
    }

    pub fn server(&self, server: &str) -> Self {
        Self {
            group: self.group.clone(),
            server: Some(server.to_string()),
            dir: None,
        }
    }

    pub fn dir(&self, dir: &str) -> Self {
        Self {
            group: self.group.clone(),
            server: self.server.clone(),
            dir: Some(dir.to_string()),
        }
    }

    /// Components joined with `-`, used for per-directory file names
    pub fn joined(&self, separator: &str) -> String {
        let mut parts = vec![self.group.as_str()];
        parts.extend(self.server.as_deref());
        parts.extend(self.dir.as_deref());
        parts.join(separator)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.joined("/"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutcomeStatus {
    Ok,
    Skipped,
    Warning,
    Error,
}

/// Optional numeric results of a leaf operation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutcomeMetrics {
    pub files: Option<u64>,
    pub bytes: Option<u64>,
    pub duration: Option<Duration>,
}

/// Result of one operation at one node
#[derive(Debug, Clone, PartialEq)]
pub struct OperationOutcome {
    pub status: OutcomeStatus,
    pub message: String,
    /// Report cells after the path column
    pub cells: Vec<String>,
    pub metrics: Option<OutcomeMetrics>,
    descend: bool,
}

impl OperationOutcome {
    fn with_status(status: OutcomeStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            cells: Vec::new(),
            metrics: None,
            descend: status == OutcomeStatus::Ok,
        }
    }

    pub fn ok() -> Self {
        Self::with_status(OutcomeStatus::Ok, "")
    }

    pub fn ok_with(message: impl Into<String>) -> Self {
        Self::with_status(OutcomeStatus::Ok, message)
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self::with_status(OutcomeStatus::Skipped, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_status(OutcomeStatus::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_status(OutcomeStatus::Error, message)
    }

    pub fn with_cells<I, S>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cells = cells.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_metrics(mut self, metrics: OutcomeMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Keep descending into the subtree despite a warning.
    pub fn proceed(mut self) -> Self {
        if self.status == OutcomeStatus::Warning {
            self.descend = true;
        }
        self
    }

    pub fn should_descend(&self) -> bool {
        self.descend
    }

    pub fn is_error(&self) -> bool {
        self.status == OutcomeStatus::Error
    }
}
