//! Configuration management for snowguard.
//!
//! Handles loading configuration from TOML files and environment variables:
//! warehouse CLI selectors, exclusion rules, and the object repository
//! location. [`ConfigStore`] holds the loaded value for the process and is
//! only ever replaced by an explicit [`ConfigStore::reload`].

use crate::error::{GuardError, Result};
use crate::executor::ExecOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::info;

/// Main configuration structure for snowguard.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Warehouse CLI settings.
    #[serde(default)]
    pub cli: CliConfig,

    /// Objects the guardrail must never expose.
    #[serde(default)]
    pub exclusions: ExclusionConfig,

    /// Local object repository settings.
    #[serde(default)]
    pub repository: RepositoryConfig,
}

/// Warehouse CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CliConfig {
    /// CLI executable name or path.
    #[serde(default = "default_binary")]
    pub binary: String,

    /// Named CLI connection.
    pub connection: Option<String>,

    /// Warehouse to run statements on.
    pub warehouse: Option<String>,

    /// Role to assume.
    pub role: Option<String>,

    /// Per-call timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_binary() -> String {
    "snow".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            connection: None,
            warehouse: None,
            role: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl CliConfig {
    /// Returns the connection selectors forwarded to every CLI call.
    pub fn exec_options(&self) -> ExecOptions {
        ExecOptions {
            connection: self.connection.clone(),
            warehouse: self.warehouse.clone(),
            role: self.role.clone(),
        }
    }

    /// Returns the per-call timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Applies environment variables (SNOWGUARD_CONNECTION, etc.) as defaults.
    pub fn apply_env_defaults(&mut self) {
        if self.connection.is_none() {
            self.connection = std::env::var("SNOWGUARD_CONNECTION").ok();
        }
        if self.warehouse.is_none() {
            self.warehouse = std::env::var("SNOWGUARD_WAREHOUSE").ok();
        }
        if self.role.is_none() {
            self.role = std::env::var("SNOWGUARD_ROLE").ok();
        }
    }
}

/// Exclusion rules: ordered regex sources plus literal object-type tokens.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ExclusionConfig {
    /// Case-insensitive regex sources, checked in order.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Object names or types blocked outright (compared uppercased).
    #[serde(default)]
    pub object_types: Vec<String>,
}

/// Object repository configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepositoryConfig {
    /// Directory that receives synced DDL files.
    #[serde(default = "default_target_dir")]
    pub target_dir: PathBuf,
}

fn default_target_dir() -> PathBuf {
    PathBuf::from("./object-repository")
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            target_dir: default_target_dir(),
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("snowguard")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| GuardError::invalid_input(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            GuardError::invalid_input(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }
}

/// Process-wide configuration holder with explicit reload.
///
/// Readers take an `Arc` snapshot; in-flight work keeps the snapshot it
/// started with even if a reload happens concurrently.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    current: RwLock<Arc<Config>>,
}

impl ConfigStore {
    /// Loads the configuration at `path` once.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = Self::load(&path)?;
        Ok(Self {
            path,
            current: RwLock::new(Arc::new(config)),
        })
    }

    /// Returns the current configuration snapshot.
    pub fn current(&self) -> Arc<Config> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Re-reads the backing file and swaps the snapshot.
    ///
    /// On error the previous snapshot stays in place.
    pub fn reload(&self) -> Result<Arc<Config>> {
        let config = Arc::new(Self::load(&self.path)?);
        match self.current.write() {
            Ok(mut guard) => *guard = Arc::clone(&config),
            Err(poisoned) => *poisoned.into_inner() = Arc::clone(&config),
        }
        info!("Configuration reloaded from {}", self.path.display());
        Ok(config)
    }

    fn load(path: &Path) -> Result<Config> {
        let mut config = Config::load_from_file(path)?;
        config.cli.apply_env_defaults();
        Ok(config)
    }
}
