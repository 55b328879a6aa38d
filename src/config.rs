use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::compressor::Codec;
use crate::error::{Result, StoreError};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/news_index.db")
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root under which `raw/`, `processed/` and `compressed/` live.
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,
    /// Codec used for the archival copy written by `save`.
    #[serde(default)]
    pub codec: Codec,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            codec: Codec::default(),
        }
    }
}

fn default_data_root() -> PathBuf {
    PathBuf::from("data")
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
        }
    }
}

fn default_limit() -> i64 {
    100
}

impl Config {
    /// Configuration rooted at `root`: data under `root`, database at
    /// `root/news_index.db`.
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            db: DbConfig {
                path: root.join("news_index.db"),
            },
            storage: StorageConfig {
                data_root: root.to_path_buf(),
                codec: Codec::default(),
            },
            search: SearchConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        StoreError::config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| StoreError::config(format!("Failed to parse config file: {}", e)))?;

    if config.search.default_limit < 1 {
        return Err(StoreError::config("search.default_limit must be >= 1"));
    }

    if config.db.path.as_os_str().is_empty() {
        return Err(StoreError::config("db.path must not be empty"));
    }

    if config.storage.data_root.as_os_str().is_empty() {
        return Err(StoreError::config("storage.data_root must not be empty"));
    }

    Ok(config)
}
