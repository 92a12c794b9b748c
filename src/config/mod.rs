//! Application configuration.
//!
//! The configuration is a pretty-printed JSON file at
//! `<config_dir>/tomato-timer/config.json`. Every field has a default, so a
//! partial (or missing) file is fine. Timer parameters are validated on load.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::TimerParams;

/// Directory name used under the platform config and data directories.
pub const APP_DIR_NAME: &str = "tomato-timer";

const CONFIG_FILE_NAME: &str = "config.json";

/// Default socket path, relative to the home directory.
const DEFAULT_SOCKET_PATH: &str = ".tomato-timer/tomato-timer.sock";

/// Overrides the socket path.
pub const SOCKET_ENV: &str = "TOMATO_TIMER_SOCKET";

/// Overrides the config file path.
pub const CONFIG_ENV: &str = "TOMATO_TIMER_CONFIG";

/// Persisted application settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub params: TimerParams,

    /// Unix socket the daemon listens on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_path: Option<PathBuf>,

    /// Where tasks and notification locks are stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Loads the configuration from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Loads the configuration from `path`.
    ///
    /// A missing file yields the defaults, and so does a file that is not
    /// valid JSON (with a warning).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its timer parameters
    /// are invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()))
            }
        };

        let config: Self = match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), "ignoring malformed config: {}", e);
                return Ok(Self::default());
            }
        };

        config
            .params
            .validate()
            .with_context(|| format!("invalid timer settings in {}", path.display()))?;
        Ok(config)
    }

    /// Saves the configuration to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    /// Saves the configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        debug!(path = %path.display(), "config saved");
        Ok(())
    }

    /// Resolves the socket path: environment, then config, then default.
    pub fn socket_path(&self) -> Result<PathBuf> {
        if let Some(path) = env_path(SOCKET_ENV) {
            return Ok(path);
        }
        match &self.socket_path {
            Some(path) => Ok(path.clone()),
            None => default_socket_path(),
        }
    }

    /// Resolves the data directory.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_data_dir(),
        }
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Returns the config file path, honoring [`CONFIG_ENV`].
pub fn config_path() -> Result<PathBuf> {
    if let Some(path) = env_path(CONFIG_ENV) {
        return Ok(path);
    }
    let dir = dirs::config_dir().context("could not determine the config directory")?;
    Ok(dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Returns `~/.tomato-timer/tomato-timer.sock`.
pub fn default_socket_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("could not determine the home directory")?;
    Ok(home.join(DEFAULT_SOCKET_PATH))
}

/// Returns `<data_dir>/tomato-timer`.
pub fn default_data_dir() -> Result<PathBuf> {
    let dir = dirs::data_dir().context("could not determine the data directory")?;
    Ok(dir.join(APP_DIR_NAME))
}
