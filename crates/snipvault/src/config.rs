//! # Configuration
//!
//! Store configuration is derived with [`confique`], which handles layered
//! loading from a TOML file and environment variables.
//!
//! ## Resolution Order
//!
//! 1. **Environment variables**: `SNIPVAULT_STORAGE_DIR`, `SNIPVAULT_CACHE_TTL_MS`, ...
//! 2. **Config file**: the TOML file passed to [`StoreConfig::load`], if any.
//! 3. **Compiled defaults**: `#[config(default = ...)]`.
//!
//! When no storage directory is configured, the OS data directory from the
//! `directories` crate is used.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `storage_dir` | OS data dir | Where both JSON files live |
//! | `snippets_file` | `snippets.json` | Snippet collection file name |
//! | `directories_file` | `directories.json` | Directory collection file name |
//! | `cache_ttl_ms` | `10000` | Freshness window of cached snapshots |
//! | `retry_attempts` | `3` | Attempts per read or commit |
//! | `retry_delay_ms` | `1000` | Pause between attempts |
//! | `repair_on_open` | `true` | Run the doctor pass when opening |

use crate::error::{Result, SnipError};
use crate::store::RetryPolicy;
use confique::Config;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding the collection files.
    #[config(env = "SNIPVAULT_STORAGE_DIR")]
    pub storage_dir: Option<PathBuf>,

    #[config(env = "SNIPVAULT_SNIPPETS_FILE", default = "snippets.json")]
    pub snippets_file: String,

    #[config(env = "SNIPVAULT_DIRECTORIES_FILE", default = "directories.json")]
    pub directories_file: String,

    #[config(env = "SNIPVAULT_CACHE_TTL_MS", default = 10000)]
    pub cache_ttl_ms: u64,

    #[config(env = "SNIPVAULT_RETRY_ATTEMPTS", default = 3)]
    pub retry_attempts: u32,

    #[config(env = "SNIPVAULT_RETRY_DELAY_MS", default = 1000)]
    pub retry_delay_ms: u64,

    #[config(env = "SNIPVAULT_REPAIR_ON_OPEN", default = true)]
    pub repair_on_open: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_dir: None,
            snippets_file: "snippets.json".to_string(),
            directories_file: "directories.json".to_string(),
            cache_ttl_ms: 10_000,
            retry_attempts: 3,
            retry_delay_ms: 1_000,
            repair_on_open: true,
        }
    }
}

impl StoreConfig {
    /// Load from the environment, then `file` (if given), then defaults.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Self::builder().env();
        if let Some(file) = file {
            builder = builder.file(file);
        }
        Ok(builder.load()?)
    }

    /// Defaults rooted at `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: Some(dir.into()),
            ..Default::default()
        }
    }

    /// The configured storage directory, or the OS data directory.
    pub fn storage_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.storage_dir {
            return Ok(dir.clone());
        }
        ProjectDirs::from("dev", "snipvault", "snipvault")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| SnipError::Config("no home directory to derive a storage dir from".into()))
    }

    pub fn snippets_path(&self) -> Result<PathBuf> {
        Ok(self.storage_dir()?.join(&self.snippets_file))
    }

    pub fn directories_path(&self) -> Result<PathBuf> {
        Ok(self.storage_dir()?.join(&self.directories_file))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, Duration::from_millis(self.retry_delay_ms))
    }
}
