//! This module provides reusable test utilities:
//! - In-memory storage, transfer, archive and notifier collaborators
//! - Config directory builder
//! - Common test data

// Allow unused code in test fixtures - each test binary uses a subset
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod mock_backends;
pub mod test_config;
pub mod test_data;

// Re-export commonly used items
pub use mock_backends::{MockArchiver, MockNotifier, MockStorage, MockTransfer};
pub use test_config::{TestConfig, TestConfigBuilder};
pub use test_data::*;
