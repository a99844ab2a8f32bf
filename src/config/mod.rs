//! Configuration management for masters

pub mod schema;

pub use schema::Config;

use crate::error::{MastersError, MastersResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("masters")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("masters")
    }

    /// Load configuration, creating default if not exists
    pub async fn load(&self) -> MastersResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> MastersResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| MastersError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| MastersError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> MastersResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            MastersError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> MastersResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| MastersError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Ensure the working directory and its staging directory exist
    pub async fn ensure_working_dirs(config: &Config) -> MastersResult<()> {
        let dirs = [working_dir(config), isos_dir(config)];

        for dir in &dirs {
            fs::create_dir_all(dir).await.map_err(|e| {
                MastersError::io(format!("creating directory {}", dir.display()), e)
            })?;
        }

        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Directory holding master disks
pub fn working_dir(config: &Config) -> PathBuf {
    config
        .workspace
        .working_dir
        .clone()
        .unwrap_or_else(|| ConfigManager::state_dir().join("workingdir"))
}

/// Staging directory for downloaded ISOs
pub fn isos_dir(config: &Config) -> PathBuf {
    working_dir(config).join("isos")
}

/// Image recipe file
pub fn images_path(config: &Config) -> PathBuf {
    config
        .workspace
        .images
        .clone()
        .unwrap_or_else(|| working_dir(config).join("images.toml"))
}
