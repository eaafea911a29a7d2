//! Configuration management for the wsvm CLI.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use wsvm_core::chain::ReadCall;

pub const CONFIG_FILE: &str = "wsvm.toml";
pub const MEMORY_DATABASE: &str = ":memory:";

/// wsvm project configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub vm: VmConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Values served to `ws_get_env`.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub chain: ChainConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmConfig {
    #[serde(default = "default_entry")]
    pub entry: String,
    #[serde(default = "default_throw_error")]
    pub throw_error: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file backing both SQL and key/value calls.
    #[serde(default = "default_database")]
    pub database: String,
    /// Table schema applied before each run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// Offline chain: canned read results keyed by `chain_id:to:data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    #[serde(default)]
    pub responses: BTreeMap<String, String>,
}

// Default value functions
fn default_entry() -> String { wsvm_host::driver::DEFAULT_ENTRY.to_string() }
fn default_throw_error() -> bool { true }
fn default_database() -> String { ".wsvm/data.db".to_string() }

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            entry: default_entry(),
            throw_error: default_throw_error(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            schema: None,
        }
    }
}

impl ChainConfig {
    /// Every configured response as a typed read call.
    pub fn read_calls(&self) -> Result<Vec<(ReadCall, String)>> {
        self.responses
            .iter()
            .map(|(key, value)| Ok((parse_response_key(key)?, value.clone())))
            .collect()
    }
}

/// Parses `chain_id:to:data`.
pub fn parse_response_key(key: &str) -> Result<ReadCall> {
    let mut parts = key.splitn(3, ':');
    let (Some(chain_id), Some(to), Some(data)) = (parts.next(), parts.next(), parts.next()) else {
        bail!("chain response key `{}` is not chain_id:to:data", key);
    };
    let chain_id = chain_id
        .trim()
        .parse()
        .with_context(|| format!("Invalid chain id in `{}`", key))?;
    Ok(ReadCall {
        chain_id,
        to: to.trim().to_string(),
        data: data.trim().to_string(),
    })
}

impl Config {
    /// Load config from wsvm.toml in the current or parent directories.
    pub fn load() -> Result<Self> {
        match find_config_file() {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Save config to the specified path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Generate default config as TOML string.
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Config::default()).context("Failed to serialize config")
    }

    pub fn uses_memory_database(&self) -> bool {
        self.storage.database == MEMORY_DATABASE
    }
}

/// Find wsvm.toml in current or parent directories.
fn find_config_file() -> Option<PathBuf> {
    find_config_file_from(std::env::current_dir().ok()?)
}

fn find_config_file_from(mut dir: PathBuf) -> Option<PathBuf> {
    loop {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

/// Get the wsvm data directory (.wsvm/).
pub fn data_dir(base: &Path) -> PathBuf {
    base.join(".wsvm")
}
