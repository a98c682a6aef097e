//! Configuration file loading
//!
//! The config file lives at `$STOW_CONFIG_DIR/config.toml`, falling back to
//! the platform config directory (`~/.config/stow/config.toml` on Linux).

use std::path::{Path, PathBuf};

use stow_core::{ClientConfig, Error, Result};

const CONFIG_FILE: &str = "config.toml";

/// Locates and reads the client configuration
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a manager for the default location
    pub fn new() -> Result<Self> {
        let dir = match std::env::var_os("STOW_CONFIG_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .map(|d| d.join("stow"))
                .ok_or_else(|| Error::Config("Cannot determine config directory".into()))?,
        };
        Ok(Self::with_dir(dir))
    }

    /// Create a manager reading from `dir` (useful for testing)
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            config_path: dir.as_ref().join(CONFIG_FILE),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the configuration; a missing file yields the defaults
    pub fn load(&self) -> Result<ClientConfig> {
        if !self.config_path.exists() {
            tracing::debug!(path = %self.config_path.display(), "No config file, using defaults");
            return Ok(ClientConfig::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let config: ClientConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("{}: {e}", self.config_path.display()))
        })?;

        tracing::debug!(path = %self.config_path.display(), "Loaded config");
        Ok(config)
    }
}
