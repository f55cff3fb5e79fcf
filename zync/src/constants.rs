//! Central repository for defaults, file names and report formatting constants

use std::time::Duration;

/// Name used in report subjects, lock files and the log file
pub const APP_NAME: &str = "zync";

/// Default configuration values
pub mod defaults {
    /// Directory holding `main.toml` and the group files
    pub const CONFIG_DIR: &str = "config";

    /// Main configuration file name inside the config directory
    pub const MAIN_CONFIG_FILE: &str = "main.toml";

    /// Directory for run lock files
    pub const LOCK_DIR: &str = "/run/lock";

    /// SSH port used when a server does not set one
    pub const SSH_PORT: u16 = 22;

    /// Mail recipient for reports
    pub const MAIL_TO: &str = "root";

    /// Archive directories unless a directory opts out
    pub const PACK_TO_ZIP: bool = true;
}

/// Report table formatting
pub mod report {
    /// Width of the delimiter line between report sections
    pub const DELIMITER_WIDTH: usize = 80;

    /// Cell text for a failed step
    pub const CELL_ERROR: &str = "ERROR";

    /// Cell text for a step that was not attempted
    pub const CELL_SKIP: &str = "SKIP";

    /// Cell text for a metric that could not be determined
    pub const CELL_UNKNOWN: &str = "err";

    /// Prune cell text when retention is off for the period tag
    pub const CELL_DISABLED: &str = "Disabled";
}

/// External program settings
pub mod commands {
    use super::Duration;

    /// Message fragment reported by `zfs` for a missing dataset
    pub const ZFS_MISSING_DATASET: &str = "dataset does not exist";

    /// Timeout for webhook delivery
    pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

    /// Header marking report mails as machine generated
    pub const MAIL_AUTO_SUBMITTED: &str = "Auto-Submitted: auto-generated";
}
