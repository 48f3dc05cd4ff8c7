//! Configuration types and loading for ssh-askpass.
//!
//! Configuration is loaded from `~/.config/ssh-askpass/config.toml`
//! (or the platform's equivalent config directory).
//!
//! # Error Handling
//!
//! - If the config file doesn't exist, default values are returned.
//! - If the config file exists but is invalid, an error is returned (fail fast).
//!
//! # Example Configuration
//!
//! ```toml
//! [prompt]
//! default_remember = true     # remember control state before the first toggle
//! frontend = "auto"           # auto, terminal or gtk
//!
//! [store]
//! service = "SSH"             # keychain service name for stored secrets
//!
//! [preferences]
//! path = "/home/alice/.config/ssh-askpass/preferences.json"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Prompt configuration.
    pub prompt: PromptConfig,
    /// Credential store configuration.
    pub store: StoreConfig,
    /// Preference file configuration.
    pub preferences: PreferencesConfig,
}

/// Which dialog implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Frontend {
    /// GTK when compiled in and a display is available, terminal otherwise.
    #[default]
    Auto,
    /// Prompt on the controlling terminal.
    Terminal,
    /// GTK4 dialog.
    Gtk,
}

impl std::fmt::Display for Frontend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frontend::Auto => write!(f, "auto"),
            Frontend::Terminal => write!(f, "terminal"),
            Frontend::Gtk => write!(f, "gtk"),
        }
    }
}

/// Configuration for prompts.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PromptConfig {
    /// State of the remember control when no preference is stored (default: false).
    pub default_remember: bool,
    /// Dialog implementation (default: auto).
    pub frontend: Frontend,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            default_remember: false,
            frontend: Frontend::Auto,
        }
    }
}

/// Configuration for the credential store.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Service name under which secrets are stored (default: "SSH").
    pub service: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            service: "SSH".to_string(),
        }
    }
}

/// Configuration for the preference file.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct PreferencesConfig {
    /// Path of the preference file; platform default when unset.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Returns the default configuration file path.
    ///
    /// Returns `~/.config/ssh-askpass/config.toml` using `dirs::config_dir()`,
    /// or `None` if the config directory cannot be determined.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ssh-askpass").join("config.toml"))
    }

    /// Load configuration from the default path.
    ///
    /// - Returns `Ok(Config::default())` if no config file exists.
    /// - Returns `Err` if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// The preference file to use.
    ///
    /// Resolution order:
    /// 1. `[preferences] path` from config
    /// 2. `<preference dir>/ssh-askpass/preferences.json`
    pub fn preferences_path(&self) -> Option<PathBuf> {
        self.preferences.path.clone().or_else(|| {
            dirs::preference_dir().map(|p| p.join("ssh-askpass").join("preferences.json"))
        })
    }
}
