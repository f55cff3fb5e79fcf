pub mod manager;
pub mod tree;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::defaults;
use crate::snapshot::RetentionPolicy;

pub use manager::ConfigManager;
pub use tree::{ConfigTree, Directory, Group, Server, Settings};

/// Contents of `main.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainConfig {
    pub zfs_path: Option<String>,
    pub backup_path: Option<String>,
    pub zip_path: Option<String>,
    pub log_path: Option<String>,
    #[serde(default = "default_lock_dir")]
    pub lock_dir: String,
    pub ssh_user: Option<String>,
    pub zync_user: Option<String>,
    pub hostname: Option<String>,
    pub timezone: Option<String>,
    #[serde(default)]
    pub retention: RetentionPolicy,
    // Group type -> rsync argument templates
    #[serde(default)]
    pub rsync_args: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub notify: NotifyConfig,
}

fn default_lock_dir() -> String {
    defaults::LOCK_DIR.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotifyConfig {
    #[serde(default = "default_mail_to")]
    pub mail_to: String,
    pub webhook_url: Option<String>,
}

fn default_mail_to() -> String {
    defaults::MAIL_TO.to_string()
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            mail_to: default_mail_to(),
            webhook_url: None,
        }
    }
}

/// One `<group>.toml` file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupConfigFile {
    #[serde(rename = "type")]
    pub group_type: Option<String>,
    #[serde(default)]
    pub servers: BTreeMap<String, ServerConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub ssh_user: Option<String>,
    #[serde(default)]
    pub dirs: BTreeMap<String, DirConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirConfig {
    pub remote: Option<String>,
    pub packtozip: Option<bool>,
}
