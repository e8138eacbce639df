use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::allocation::{EmployeeType, Roster};
use crate::error::{PipelineError, Result};
use crate::source::{default_catalog, TaskType};

pub mod loader;

pub use loader::ConfigLoader;

/// Valid log levels for configuration validation.
pub const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

pub const DEFAULT_ENDPOINT: &str = "https://labdados.com/produtos";

/// Get the directory holding `config.toml`
pub fn get_config_dir() -> Result<PathBuf> {
    ProjectDirs::from("com", "salesboard", "salesboard")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| PipelineError::Config("Could not determine home directory".to_string()))
}

/// Settings for one dashboard run.
///
/// Loaded with layered precedence:
///
/// 1. Hardcoded defaults (lowest priority)
/// 2. Config file (`--config` path, else `<config dir>/config.toml`)
/// 3. Environment variables (`SALESBOARD_*` prefix) (highest priority)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Products API endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Bound on the whole HTTP request.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default)]
    pub retry: RetrySettings,

    /// Prefix of formatted revenue figures.
    #[serde(default = "default_currency_prefix")]
    pub currency_prefix: String,

    /// Logging level when no `-v` flag is given.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Rows kept by the top-N tables.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    #[serde(default)]
    pub synthetic: SyntheticSettings,
}

/// Bounded retry around the load step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Extra attempts after the first failure; zero disables retrying.
    #[serde(default)]
    pub attempts: u32,

    #[serde(default = "default_initial_delay", with = "humantime_serde")]
    pub initial_delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 0,
            initial_delay: default_initial_delay(),
        }
    }
}

/// Inputs of the fake task-allocation data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSettings {
    #[serde(default = "default_users")]
    pub users: Vec<String>,

    #[serde(default = "default_catalog")]
    pub tasks: Vec<TaskType>,

    #[serde(default = "default_roster")]
    pub roster: Roster,
}

impl Default for SyntheticSettings {
    fn default() -> Self {
        Self {
            users: default_users(),
            tasks: default_catalog(),
            roster: default_roster(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout: default_timeout(),
            retry: RetrySettings::default(),
            currency_prefix: default_currency_prefix(),
            log_level: default_log_level(),
            top_n: default_top_n(),
            synthetic: SyntheticSettings::default(),
        }
    }
}

// Default value functions for serde
fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_currency_prefix() -> String {
    "R$".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_top_n() -> usize {
    5
}

fn default_users() -> Vec<String> {
    ["ana.costa", "joao.pereira", "maria.santos", "lucas.oliveira"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_roster() -> Roster {
    Roster::new()
        .with("ana.costa", EmployeeType::Staff)
        .with("joao.pereira", EmployeeType::Staff)
        .with("maria.santos", EmployeeType::Staff)
        .with("lucas.oliveira", EmployeeType::Intern)
}

impl DashboardConfig {
    pub fn merge_env_vars(&mut self) {
        self.merge_env_with(|key| std::env::var(key).ok());
    }

    /// Apply `SALESBOARD_*` overrides read through `lookup`
    pub fn merge_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup("SALESBOARD_ENDPOINT") {
            self.endpoint = endpoint;
        }

        if let Some(log_level) = lookup("SALESBOARD_LOG_LEVEL") {
            self.log_level = log_level;
        }

        if let Some(secs) = lookup("SALESBOARD_TIMEOUT_SECS") {
            if let Ok(value) = secs.parse::<u64>() {
                self.timeout = Duration::from_secs(value);
            }
        }

        if let Some(currency) = lookup("SALESBOARD_CURRENCY") {
            self.currency_prefix = currency;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(PipelineError::Config(format!(
                "endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }
        if self.timeout.is_zero() {
            return Err(PipelineError::Config("timeout must be positive".to_string()));
        }
        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(PipelineError::Config(format!(
                "invalid log_level '{}' (expected one of {:?})",
                self.log_level, VALID_LOG_LEVELS
            )));
        }
        Ok(())
    }
}
