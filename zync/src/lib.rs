pub mod backends;
pub mod config;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod report;
pub mod run_lock;
pub mod services;
pub mod snapshot;
pub mod tasks;

// Re-export commonly used types
pub use config::{ConfigManager, ConfigTree};
pub use engine::{LevelOperations, OperationOutcome, TraversalEngine};
pub use errors::{ConfigError, ZyncError};
pub use report::{Report, ReportAggregator, RunTotals};
pub use run_lock::RunLock;
pub use services::NotificationService;
pub use snapshot::SnapshotPolicy;
pub use tasks::{Backends, RunKind, TaskRunner};
