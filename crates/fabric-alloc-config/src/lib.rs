pub mod error;

pub use error::*;

use fabric_alloc::AllocatorConfig;
use fabric_alloc::store::{DEFAULT_POLL_INTERVAL, DEFAULT_STALE_AFTER, FileStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable pointing directly at a settings file
pub const CONFIG_ENV: &str = "FABRIC_ALLOC_CONFIG";

const APP_DIR: &str = "fabric-alloc";
const GLOBAL_CONFIG_FILE: &str = "config.yaml";
const CANDIDATES: [&str; 2] = ["fabric-alloc.local.yaml", "fabric-alloc.yaml"];

/// Everything a settings file can configure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub allocator: AllocatorConfig,
    pub store: StoreSettings,
}

/// Where and how the allocation table is stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Directory holding the table and its lock (defaults to the user data dir)
    pub state_dir: Option<PathBuf>,

    /// Age after which a lock is treated as abandoned
    pub stale_lock_secs: u64,

    /// How often a waiting caller re-checks a held lock
    pub lock_poll_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            state_dir: None,
            stale_lock_secs: DEFAULT_STALE_AFTER.as_secs(),
            lock_poll_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

impl StoreSettings {
    /// Resolved state directory
    pub fn state_dir(&self) -> Result<PathBuf> {
        match &self.state_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(dirs::data_local_dir()
                .ok_or(ConfigError::DataDirNotFound)?
                .join(APP_DIR)),
        }
    }

    /// Open the file store these settings describe
    pub fn open(&self) -> Result<FileStore> {
        Ok(FileStore::new(self.state_dir()?)
            .with_stale_after(Duration::from_secs(self.stale_lock_secs))
            .with_poll_interval(Duration::from_millis(self.lock_poll_ms)))
    }
}

/// fabric-alloc's global config directory (`~/.config/fabric-alloc`)
pub fn get_config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join(APP_DIR))
}

/// Look for a settings file
///
/// Search order:
/// 1. `FABRIC_ALLOC_CONFIG` (direct path)
/// 2. Current directory: fabric-alloc.local.yaml, fabric-alloc.yaml
/// 3. ~/.config/fabric-alloc/config.yaml
pub fn find_config_file() -> Result<Option<PathBuf>> {
    if let Ok(config_path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        tracing::warn!("{} points at missing file {}", CONFIG_ENV, path.display());
    }

    let current_dir = std::env::current_dir()?;
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    if let Ok(config_dir) = get_config_dir() {
        let global_config = config_dir.join(GLOBAL_CONFIG_FILE);
        if global_config.exists() {
            return Ok(Some(global_config));
        }
    }

    Ok(None)
}

/// Parse a settings file; missing keys take their defaults
pub fn load_settings(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }

    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Find and load settings, falling back to defaults when no file exists
pub fn load() -> Result<(Settings, Option<PathBuf>)> {
    match find_config_file()? {
        Some(path) => {
            tracing::debug!("Loading settings from {}", path.display());
            Ok((load_settings(&path)?, Some(path)))
        }
        None => {
            tracing::debug!("No settings file found, using defaults");
            Ok((Settings::default(), None))
        }
    }
}
