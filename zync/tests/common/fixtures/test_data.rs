//! Common test data and constants

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

use zync::config::{GroupConfigFile, MainConfig};
use zync::ConfigTree;

pub const HOSTNAME: &str = "backup01";
pub const ZFS_ROOT: &str = "tank/backup";

/// Generate a random run ID for testing
pub fn random_run_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

/// Calendar days with a known period tag
pub mod days {
    /// Saturday, ISO week 2
    pub const WEEKLY: (i32, u32, u32) = (2024, 1, 13);
    /// Saturday, ISO week 1
    pub const QUARTERLY: (i32, u32, u32) = (2024, 1, 6);
    /// Wednesday
    pub const DAILY: (i32, u32, u32) = (2024, 1, 10);
    /// Saturday, ISO week 52
    pub const END_OF_2023: (i32, u32, u32) = (2023, 12, 30);
}

/// Tree of two groups without touching the filesystem:
/// `web/{srv1/{etc,www}, srv2/{etc}}` and `db/{db1/{data}}`
pub fn fleet_tree() -> ConfigTree {
    let main: MainConfig = toml::from_str(
        r#"
zfs_path = "tank/backup"
backup_path = "/tank/backup"
zip_path = "/tank/zip"
log_path = "/var/log/zync"
ssh_user = "backup"

[retention]
d = 7
w = 30
q = 365
"#,
    )
    .expect("valid main config");

    let web: GroupConfigFile = toml::from_str(
        r#"
type = "linux"

[servers.srv1]
host = "srv1.example.com"

[servers.srv1.dirs.etc]
remote = "/etc"

[servers.srv1.dirs.www]
remote = "/var/www"

[servers.srv2]
host = "srv2.example.com"
port = 2222

[servers.srv2.dirs.etc]
remote = "/etc"
"#,
    )
    .expect("valid group config");

    let db: GroupConfigFile = toml::from_str(
        r#"
type = "linux"

[servers.db1]
host = "db1.example.com"

[servers.db1.dirs.data]
remote = "/var/lib/postgresql"
"#,
    )
    .expect("valid group config");

    let mut groups = BTreeMap::new();
    groups.insert("web".to_string(), web);
    groups.insert("db".to_string(), db);

    ConfigTree::from_parts(main, groups, Path::new("config")).expect("valid tree")
}

/// Every dataset of [`fleet_tree`], root included
pub fn fleet_datasets() -> Vec<String> {
    [
        "",
        "/db",
        "/db/db1",
        "/db/db1/data",
        "/web",
        "/web/srv1",
        "/web/srv1/etc",
        "/web/srv1/www",
        "/web/srv2",
        "/web/srv2/etc",
    ]
    .iter()
    .map(|suffix| format!("{}{}", ZFS_ROOT, suffix))
    .collect()
}
