//! Test configuration builder for creating config directories programmatically

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::test_data::{HOSTNAME, ZFS_ROOT};

/// Builder for a config directory plus the backup, zip, log and lock trees
pub struct TestConfigBuilder {
    temp_dir: TempDir,
    zfs_path: Option<String>,
    ssh_user: Option<String>,
    timezone: Option<String>,
    retention: (u32, u32, u32),
    rsync_args: BTreeMap<String, Vec<String>>,
    webhook_url: Option<String>,
    groups: BTreeMap<String, GroupBuilder>,
    create_local_dirs: bool,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self {
            temp_dir,
            zfs_path: Some(ZFS_ROOT.to_string()),
            ssh_user: Some("backup".to_string()),
            timezone: None,
            retention: (0, 0, 0),
            rsync_args: BTreeMap::new(),
            webhook_url: None,
            groups: BTreeMap::new(),
            create_local_dirs: false,
        }
    }

    pub fn without_zfs_path(mut self) -> Self {
        self.zfs_path = None;
        self
    }

    pub fn with_ssh_user(mut self, user: Option<&str>) -> Self {
        self.ssh_user = user.map(str::to_string);
        self
    }

    pub fn with_timezone(mut self, timezone: &str) -> Self {
        self.timezone = Some(timezone.to_string());
        self
    }

    pub fn with_retention(mut self, daily: u32, weekly: u32, quarterly: u32) -> Self {
        self.retention = (daily, weekly, quarterly);
        self
    }

    pub fn with_rsync_args(mut self, group_type: &str, args: &[&str]) -> Self {
        self.rsync_args.insert(
            group_type.to_string(),
            args.iter().map(|arg| arg.to_string()).collect(),
        );
        self
    }

    pub fn with_webhook(mut self, url: &str) -> Self {
        self.webhook_url = Some(url.to_string());
        self
    }

    pub fn with_group<F>(mut self, name: &str, group_type: &str, f: F) -> Self
    where
        F: FnOnce(GroupBuilder) -> GroupBuilder,
    {
        let builder = f(GroupBuilder::new(group_type));
        self.groups.insert(name.to_string(), builder);
        self
    }

    /// Also create `backup/<group>/<server>/<dir>` for every directory.
    pub fn with_local_dirs(mut self) -> Self {
        self.create_local_dirs = true;
        self
    }

    fn main_toml(&self, root: &Path) -> String {
        let mut toml = String::new();
        if let Some(zfs_path) = &self.zfs_path {
            toml.push_str(&format!("zfs_path = \"{}\"\n", zfs_path));
        }
        toml.push_str(&format!(
            "backup_path = \"{}\"\nzip_path = \"{}\"\nlog_path = \"{}\"\nlock_dir = \"{}\"\nhostname = \"{}\"\n",
            root.join("backup").display(),
            root.join("zip").display(),
            root.join("log").display(),
            root.join("lock").display(),
            HOSTNAME
        ));
        if let Some(user) = &self.ssh_user {
            toml.push_str(&format!("ssh_user = \"{}\"\n", user));
        }
        if let Some(timezone) = &self.timezone {
            toml.push_str(&format!("timezone = \"{}\"\n", timezone));
        }

        let (daily, weekly, quarterly) = self.retention;
        toml.push_str(&format!(
            "\n[retention]\ndaily = {}\nweekly = {}\nquarterly = {}\n",
            daily, weekly, quarterly
        ));

        if !self.rsync_args.is_empty() {
            toml.push_str("\n[rsync_args]\n");
            for (group_type, args) in &self.rsync_args {
                let quoted: Vec<String> = args.iter().map(|arg| format!("'{}'", arg)).collect();
                toml.push_str(&format!("{} = [{}]\n", group_type, quoted.join(", ")));
            }
        }

        toml.push_str("\n[notify]\nmail_to = \"backup-admins@example.com\"\n");
        if let Some(url) = &self.webhook_url {
            toml.push_str(&format!("webhook_url = \"{}\"\n", url));
        }
        toml
    }

    /// Build and write config files to the temp directory
    pub fn build(self) -> TestConfig {
        let root = self.temp_dir.path().to_path_buf();
        let config_dir = root.join("config");
        fs::create_dir_all(&config_dir).expect("Failed to create config dir");
        for dir in ["backup", "zip", "log", "lock"] {
            fs::create_dir_all(root.join(dir)).expect("Failed to create test dir");
        }

        fs::write(config_dir.join("main.toml"), self.main_toml(&root))
            .expect("Failed to write main.toml");

        for (name, group) in &self.groups {
            fs::write(config_dir.join(format!("{}.toml", name)), group.to_toml())
                .expect("Failed to write group config");

            fs::create_dir_all(root.join("backup").join(name)).expect("Failed to create group dir");
            if self.create_local_dirs {
                for (server_name, server) in &group.servers {
                    for dir_name in server.dirs.keys() {
                        fs::create_dir_all(
                            root.join("backup").join(name).join(server_name).join(dir_name),
                        )
                        .expect("Failed to create local dir");
                    }
                }
            }
        }

        TestConfig {
            _temp_dir: self.temp_dir,
            root,
            config_dir,
        }
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct GroupBuilder {
    group_type: String,
    servers: BTreeMap<String, ServerBuilder>,
}

impl GroupBuilder {
    fn new(group_type: &str) -> Self {
        Self {
            group_type: group_type.to_string(),
            servers: BTreeMap::new(),
        }
    }

    pub fn with_server<F>(mut self, name: &str, f: F) -> Self
    where
        F: FnOnce(ServerBuilder) -> ServerBuilder,
    {
        let builder = f(ServerBuilder::new(&format!("{}.example.com", name)));
        self.servers.insert(name.to_string(), builder);
        self
    }

    fn to_toml(&self) -> String {
        let mut toml = format!("type = \"{}\"\n", self.group_type);
        for (name, server) in &self.servers {
            toml.push_str(&format!("\n[servers.{}]\nhost = \"{}\"\n", name, server.host));
            if let Some(port) = server.port {
                toml.push_str(&format!("port = {}\n", port));
            }
            if let Some(user) = &server.ssh_user {
                toml.push_str(&format!("ssh_user = \"{}\"\n", user));
            }
            for (dir_name, (remote, packtozip)) in &server.dirs {
                toml.push_str(&format!(
                    "\n[servers.{}.dirs.{}]\nremote = \"{}\"\n",
                    name, dir_name, remote
                ));
                if let Some(packtozip) = packtozip {
                    toml.push_str(&format!("packtozip = {}\n", packtozip));
                }
            }
        }
        toml
    }
}

pub struct ServerBuilder {
    host: String,
    port: Option<u16>,
    ssh_user: Option<String>,
    dirs: BTreeMap<String, (String, Option<bool>)>,
}

impl ServerBuilder {
    fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            port: None,
            ssh_user: None,
            dirs: BTreeMap::new(),
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn ssh_user(mut self, user: &str) -> Self {
        self.ssh_user = Some(user.to_string());
        self
    }

    pub fn dir(mut self, name: &str, remote: &str) -> Self {
        self.dirs.insert(name.to_string(), (remote.to_string(), None));
        self
    }

    pub fn dir_without_zip(mut self, name: &str, remote: &str) -> Self {
        self.dirs
            .insert(name.to_string(), (remote.to_string(), Some(false)));
        self
    }
}

/// A written config directory; the temp tree lives as long as this value
pub struct TestConfig {
    _temp_dir: TempDir,
    pub root: PathBuf,
    pub config_dir: PathBuf,
}

impl TestConfig {
    pub fn backup_path(&self) -> PathBuf {
        self.root.join("backup")
    }

    pub fn zip_path(&self) -> PathBuf {
        self.root.join("zip")
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join("log")
    }

    pub fn lock_dir(&self) -> PathBuf {
        self.root.join("lock")
    }
}
