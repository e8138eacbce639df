use super::{get_config_dir, DashboardConfig};
use crate::error::Result;
use std::path::Path;
use tokio::fs;
use tracing::debug;

pub struct ConfigLoader {
    config: DashboardConfig,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config: DashboardConfig::default(),
        }
    }

    /// Load `path` when given, else the default config file if it exists,
    /// then merge environment overrides and validate.
    pub async fn load(mut self, path: Option<&Path>) -> Result<DashboardConfig> {
        match path {
            Some(path) => self.load_file(path).await?,
            None => {
                if let Ok(dir) = get_config_dir() {
                    let default_path = dir.join("config.toml");
                    if default_path.exists() {
                        self.load_file(&default_path).await?;
                    }
                }
            }
        }

        self.config.merge_env_vars();
        self.config.validate()?;
        Ok(self.config)
    }

    pub async fn load_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path).await?;
        self.config = toml::from_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(())
    }

    pub fn get_config(&self) -> &DashboardConfig {
        &self.config
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
