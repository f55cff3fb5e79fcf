//! Validated, read-only Group/Server/Directory hierarchy
//!
//! A [`ConfigTree`] is only ever built through [`ConfigTree::from_parts`],
//! which rejects incomplete configuration before any traversal starts.

use chrono_tz::Tz;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{GroupConfigFile, MainConfig, NotifyConfig};
use crate::constants::defaults;
use crate::errors::ConfigError;
use crate::snapshot::RetentionPolicy;

/// Run-wide settings resolved from `main.toml`
#[derive(Debug, Clone)]
pub struct Settings {
    pub zfs_path: String,
    pub backup_path: PathBuf,
    pub zip_path: Option<PathBuf>,
    pub log_path: PathBuf,
    pub lock_dir: PathBuf,
    pub config_dir: PathBuf,
    /// Transfer user for servers that do not set their own
    pub ssh_user: Option<String>,
    pub zync_user: Option<String>,
    pub hostname: Option<String>,
    pub timezone: Option<Tz>,
    pub retention: RetentionPolicy,
    pub rsync_args: BTreeMap<String, Vec<String>>,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: String,
    pub group_type: String,
    pub servers: Vec<Server>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Server {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub ssh_user: Option<String>,
    pub dirs: Vec<Directory>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Directory {
    pub name: String,
    pub remote_path: String,
    /// Dataset under `zfs_path`
    pub dataset: String,
    /// Mount path under `backup_path`
    pub local_path: PathBuf,
    pub pack_to_zip: bool,
}

#[derive(Debug, Clone)]
pub struct ConfigTree {
    settings: Settings,
    groups: Vec<Group>,
}

impl ConfigTree {
    /// Validate raw configuration and build the typed tree.
    ///
    /// Groups, servers and directories come out sorted by name.
    pub fn from_parts(
        main: MainConfig,
        group_files: BTreeMap<String, GroupConfigFile>,
        config_dir: &Path,
    ) -> Result<Self, ConfigError> {
        let settings = Self::resolve_settings(main, config_dir)?;

        let mut groups = Vec::with_capacity(group_files.len());
        for (group_name, group_file) in group_files {
            groups.push(Self::resolve_group(&settings, &group_name, group_file)?);
        }

        Ok(Self { settings, groups })
    }

    fn resolve_settings(main: MainConfig, config_dir: &Path) -> Result<Settings, ConfigError> {
        let zfs_path = required(main.zfs_path, "zfs_path")?;
        let backup_path = PathBuf::from(required(main.backup_path, "backup_path")?);
        let log_path = PathBuf::from(required(main.log_path, "log_path")?);

        let timezone = match main.timezone {
            Some(name) => Some(name.parse::<Tz>().map_err(|e| ConfigError::InvalidValue {
                field: "timezone".to_string(),
                reason: format!("{}", e),
            })?),
            None => None,
        };

        Ok(Settings {
            zfs_path: zfs_path.trim_end_matches('/').to_string(),
            backup_path,
            zip_path: main.zip_path.map(PathBuf::from),
            log_path,
            lock_dir: PathBuf::from(main.lock_dir),
            config_dir: config_dir.to_path_buf(),
            ssh_user: main.ssh_user,
            zync_user: main.zync_user,
            hostname: main.hostname,
            timezone,
            retention: main.retention,
            rsync_args: main.rsync_args,
            notify: main.notify,
        })
    }

    fn resolve_group(
        settings: &Settings,
        group_name: &str,
        group_file: GroupConfigFile,
    ) -> Result<Group, ConfigError> {
        let group_type = required(group_file.group_type, &format!("{}.type", group_name))?;

        if group_file.servers.is_empty() {
            return Err(ConfigError::EmptyGroup {
                group: group_name.to_string(),
            });
        }

        let mut servers = Vec::with_capacity(group_file.servers.len());
        for (server_name, server_config) in group_file.servers {
            let field_prefix = format!("{}.servers.{}", group_name, server_name);
            let host = required(server_config.host, &format!("{}.host", field_prefix))?;

            if server_config.dirs.is_empty() {
                return Err(ConfigError::EmptyServer {
                    group: group_name.to_string(),
                    server: server_name,
                });
            }

            let mut dirs = Vec::with_capacity(server_config.dirs.len());
            for (dir_name, dir_config) in server_config.dirs {
                let remote_path = required(
                    dir_config.remote,
                    &format!("{}.dirs.{}.remote", field_prefix, dir_name),
                )?;

                dirs.push(Directory {
                    dataset: format!(
                        "{}/{}/{}/{}",
                        settings.zfs_path, group_name, server_name, dir_name
                    ),
                    local_path: settings
                        .backup_path
                        .join(group_name)
                        .join(&server_name)
                        .join(&dir_name),
                    pack_to_zip: dir_config.packtozip.unwrap_or(defaults::PACK_TO_ZIP),
                    name: dir_name,
                    remote_path,
                });
            }

            servers.push(Server {
                name: server_name,
                host,
                port: server_config.port.unwrap_or(defaults::SSH_PORT),
                ssh_user: server_config.ssh_user,
                dirs,
            });
        }

        Ok(Group {
            name: group_name.to_string(),
            group_type,
            servers,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|group| group.name == name)
    }

    /// Narrow the tree to a single group, for group-scoped run kinds.
    pub fn scoped(&self, group_name: &str) -> Result<ConfigTree, ConfigError> {
        let group = self
            .group(group_name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownGroup {
                group: group_name.to_string(),
            })?;

        Ok(ConfigTree {
            settings: self.settings.clone(),
            groups: vec![group],
        })
    }

    /// Dataset of a group or server container
    pub fn group_dataset(&self, group: &Group) -> String {
        format!("{}/{}", self.settings.zfs_path, group.name)
    }

    pub fn server_dataset(&self, group: &Group, server: &Server) -> String {
        format!("{}/{}/{}", self.settings.zfs_path, group.name, server.name)
    }

    pub fn group_dir(&self, group: &Group) -> PathBuf {
        self.settings.backup_path.join(&group.name)
    }

    pub fn server_dir(&self, group: &Group, server: &Server) -> PathBuf {
        self.settings.backup_path.join(&group.name).join(&server.name)
    }

    pub fn directory_count(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|group| group.servers.iter())
            .map(|server| server.dirs.len())
            .sum()
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, ConfigError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingRequired {
            field: field.to_string(),
        }),
    }
}
