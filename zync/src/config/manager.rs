use super::{ConfigTree, GroupConfigFile, MainConfig};
use crate::constants::defaults;
use crate::errors::ConfigError;
use glob::glob;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

pub struct ConfigManager {
    current_config: Arc<ConfigTree>,
}

impl ConfigManager {
    pub async fn new(config_dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let tree = Self::load_configuration(config_dir.as_ref()).await?;
        Ok(Self {
            current_config: Arc::new(tree),
        })
    }

    pub fn get_current_config(&self) -> Arc<ConfigTree> {
        self.current_config.clone()
    }

    async fn load_configuration(config_dir: &Path) -> Result<ConfigTree, ConfigError> {
        let main_config_path = config_dir.join(defaults::MAIN_CONFIG_FILE);
        let main_config: MainConfig = read_toml(&main_config_path).await?;

        // Every other *.toml file describes one group, named after the file
        let pattern = format!("{}/*.toml", config_dir.display());
        let mut group_files = BTreeMap::new();

        let entries = glob(&pattern).map_err(|e| ConfigError::LoadFailed {
            path: pattern.clone(),
            reason: format!("Glob pattern error: {}", e),
        })?;

        for entry in entries {
            let path = entry.map_err(|e| ConfigError::LoadFailed {
                path: pattern.clone(),
                reason: format!("Glob entry error: {}", e),
            })?;
            let filename = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| ConfigError::LoadFailed {
                    path: path.display().to_string(),
                    reason: "Invalid filename".to_string(),
                })?;

            if filename == defaults::MAIN_CONFIG_FILE {
                continue;
            }

            let group_name = filename
                .strip_suffix(".toml")
                .ok_or_else(|| ConfigError::LoadFailed {
                    path: path.display().to_string(),
                    reason: "Invalid config filename".to_string(),
                })?
                .to_string();

            debug!("Loading group config: {}", path.display());
            let group_file: GroupConfigFile = read_toml(&path).await?;
            group_files.insert(group_name, group_file);
        }

        let tree = ConfigTree::from_parts(main_config, group_files, config_dir)?;

        info!(
            "Loaded {} groups, {} servers, {} directories from {}",
            tree.groups().len(),
            tree.groups().iter().map(|g| g.servers.len()).sum::<usize>(),
            tree.directory_count(),
            config_dir.display()
        );

        Ok(tree)
    }
}

async fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}
