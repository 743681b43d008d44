//! Configuration module for cmdpipe
//!
//! [`EngineConfig`] holds the defaults every chain starts from: stream
//! preferences, binding-error policy, script limits and logging.
//!
//! # Location
//!
//! The configuration file is looked up in this order:
//! 1. an explicit path passed to [`EngineConfig::load`]
//! 2. the `CMDPIPE_CONFIG` environment variable
//! 3. `<config dir>/cmdpipe/config.toml`
//!    - **Linux**: `~/.config/cmdpipe/config.toml`
//!    - **macOS**: `~/Library/Application Support/cmdpipe/config.toml`
//!    - **Windows**: `%APPDATA%\cmdpipe\config.toml`
//!
//! A missing file yields the defaults.
//!
//! # Example
//!
//! ```toml
//! [preferences]
//! warning = "SilentlyContinue"
//! verbose = "Continue"
//!
//! [binding]
//! pipeline_errors = "NonTerminating"
//!
//! [logging]
//! filter = "info,cmdpipe=trace"
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for the config directory
pub const APP_ID: &str = "cmdpipe";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding the config location
pub const CONFIG_ENV: &str = "CMDPIPE_CONFIG";

/// Get the default config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

/// Path from `CMDPIPE_CONFIG`, falling back to the default location
pub fn config_path() -> Option<PathBuf> {
    std::env::var_os(CONFIG_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(default_config_path)
}

/// Engine-wide defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub preferences: PreferenceSettings,
    pub binding: BindingSettings,
    pub scripting: ScriptSettings,
    pub logging: LoggingSettings,
}

impl EngineConfig {
    /// Load from `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_toml(&content)
            .map_err(|e| e.with_context(format!("Failed to parse config file {:?}", path)))
    }

    /// Parse TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Load from `CMDPIPE_CONFIG` or the default location. A missing file is
    /// not an error.
    pub fn load_default() -> Result<Self> {
        let path = config_path().ok_or_else(|| {
            EngineError::Config("Could not determine config directory".to_string())
        })?;

        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Load config, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load_default().unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save config to `path` as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| EngineError::Serialization(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            EngineError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }
}
