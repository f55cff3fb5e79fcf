//! Custom error types for zync
//!
//! Only run-level failures are modelled as hard errors. Everything that goes
//! wrong at a single Group, Server or Directory is described by [`NodeError`]
//! and turned into an outcome row by the traversal.

use std::fmt;

/// Main error type for a zync run
#[derive(Debug)]
pub enum ZyncError {
    /// Fatal configuration or root-container errors
    Config(ConfigError),

    /// Another run of the same kind holds the run lock
    Lock(LockError),
}

/// Configuration error variants, all fatal
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read a configuration file
    LoadFailed { path: String, reason: String },

    /// Configuration parsing error
    ParseError { path: String, reason: String },

    /// Missing required configuration
    MissingRequired { field: String },

    /// Invalid configuration value
    InvalidValue { field: String, reason: String },

    /// Group without servers
    EmptyGroup { group: String },

    /// Server without directories
    EmptyServer { group: String, server: String },

    /// Group requested on the command line but not configured
    UnknownGroup { group: String },

    /// Root container of the run is missing or unreachable
    RootUnavailable { path: String, reason: String },
}

/// Run lock error variants
#[derive(Debug)]
pub enum LockError {
    /// Lock file already present
    AlreadyRunning { path: String, holder: String },

    /// Lock file could not be written
    WriteFailed { path: String, reason: String },
}

/// Per-node failures, recoverable by containment
#[derive(Debug)]
pub enum NodeError {
    /// Container of a Group/Server/Directory does not exist
    Connectivity { path: String, reason: String },

    /// Snapshot, transfer or archive call failed
    Operation {
        path: String,
        operation: String,
        reason: String,
    },
}

/// Failure to deliver the final report
#[derive(Debug)]
pub struct NotifyError {
    pub channel: String,
    pub reason: String,
}

impl fmt::Display for ZyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZyncError::Config(e) => write!(f, "Configuration error: {}", e),
            ZyncError::Lock(e) => write!(f, "Run lock error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::LoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path, reason)
            }
            ConfigError::ParseError { path, reason } => {
                write!(f, "Failed to parse config '{}': {}", path, reason)
            }
            ConfigError::MissingRequired { field } => {
                write!(f, "Missing required field: {}", field)
            }
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
            ConfigError::EmptyGroup { group } => {
                write!(f, "Empty server list of group '{}'", group)
            }
            ConfigError::EmptyServer { group, server } => {
                write!(f, "Empty dir list of server '{}/{}'", group, server)
            }
            ConfigError::UnknownGroup { group } => {
                write!(f, "Group '{}' not found in config", group)
            }
            ConfigError::RootUnavailable { path, reason } => {
                write!(f, "Root '{}' is not available: {}", path, reason)
            }
        }
    }
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockError::AlreadyRunning { path, holder } => {
                write!(f, "File '{}' is exist, held by: {}", path, holder)
            }
            LockError::WriteFailed { path, reason } => {
                write!(f, "Failed to write lock file '{}': {}", path, reason)
            }
        }
    }
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::Connectivity { path, reason } => {
                write!(f, "skip '{}', error: '{}'", path, reason)
            }
            NodeError::Operation {
                path,
                operation,
                reason,
            } => {
                write!(f, "{} failed on '{}': {}", operation, path, reason)
            }
        }
    }
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to notify via {}: {}", self.channel, self.reason)
    }
}

impl std::error::Error for ZyncError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for LockError {}
impl std::error::Error for NodeError {}
impl std::error::Error for NotifyError {}

impl From<ConfigError> for ZyncError {
    fn from(err: ConfigError) -> Self {
        ZyncError::Config(err)
    }
}

impl From<LockError> for ZyncError {
    fn from(err: LockError) -> Self {
        ZyncError::Lock(err)
    }
}
