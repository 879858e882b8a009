use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::runtime::TICK_RATE_MS;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Tokens pre-filled into the whitelist field
    pub default_whitelist: Vec<String>,
    /// Play a short tone on a mistyped char
    pub sound: bool,
    pub tick_rate_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_whitelist: vec!["[KW]".to_string(), "[TOPIC]".to_string()],
            sound: true,
            tick_rate_ms: TICK_RATE_MS,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<(), ConfigError>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "retype") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("retype_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Missing or unreadable config falls back to defaults
    fn load(&self) -> Config {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!("no config at {}: {e}", self.path.display());
                return Config::default();
            }
        };

        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!("ignoring invalid config {}: {e}", self.path.display());
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

/// Load the config, writing the defaults out first if no file exists yet
pub fn load_or_init(store: &FileConfigStore) -> Config {
    if !store.path().exists() {
        let cfg = Config::default();
        match store.save(&cfg) {
            Ok(()) => tracing::info!("wrote default config to {}", store.path().display()),
            Err(e) => tracing::warn!("could not write {}: {e}", store.path().display()),
        }
        return cfg;
    }
    store.load()
}

/// Where the log file goes; the TUI owns stdout.
pub fn log_path() -> PathBuf {
    ProjectDirs::from("", "", "retype")
        .map(|pd| pd.data_local_dir().join("retype.log"))
        .unwrap_or_else(|| PathBuf::from("retype.log"))
}
