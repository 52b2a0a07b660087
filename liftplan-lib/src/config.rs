//src/config.rs
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_CONFIG_DIR: &str = "liftplan";
const CONFIG_ENV_VAR: &str = "LIFTPLAN_CONFIG_DIR"; // Environment variable name

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine configuration directory.")]
    CannotDetermineConfigDir,
    #[error("I/O error accessing config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file (TOML): {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize config data (TOML): {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Invalid threshold value: {0}")]
    InvalidThreshold(String),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)] // Ensure defaults are used if fields are missing
pub struct Theme {
    pub header_color: String,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            header_color: "Green".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)] // Ensure defaults are used if fields are missing
pub struct Config {
    /// Pointer travel (in render units) before a mouse press becomes a drag.
    pub drag_activation_distance: f64,
    /// Hold duration before a touch press becomes a drag.
    pub touch_hold_ms: u64,
    /// Cadence of insertion-indicator recomputation (~60 Hz default).
    pub indicator_interval_ms: u64,
    /// Quiet window after a mutation settles before background refetches
    /// may replace the plan again.
    pub refetch_debounce_ms: u64,

    // Theming
    pub theme: Theme,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            drag_activation_distance: 2.0,
            touch_hold_ms: 250,
            indicator_interval_ms: 16, // ~60 Hz
            refetch_debounce_ms: 400,
            theme: Theme::default(),
        }
    }
}

impl Config {
    #[must_use]
    pub const fn touch_hold(&self) -> Duration {
        Duration::from_millis(self.touch_hold_ms)
    }

    #[must_use]
    pub const fn indicator_interval(&self) -> Duration {
        Duration::from_millis(self.indicator_interval_ms)
    }

    #[must_use]
    pub const fn refetch_debounce(&self) -> Duration {
        Duration::from_millis(self.refetch_debounce_ms)
    }
}

/// Determines the path to the configuration file.
pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir_override = std::env::var(CONFIG_ENV_VAR).ok();

    let config_dir_path = if let Some(path_str) = config_dir_override {
        let path = PathBuf::from(path_str);
        if !path.is_dir() {
            eprintln!( // Keep warning, as it's about env var setup
                "Warning: Environment variable {} points to '{}', which is not a directory. Trying to create it.",
                CONFIG_ENV_VAR,
                path.display()
            );
            fs::create_dir_all(&path)?;
        }
        path
    } else {
        let base_config_dir = dirs::config_dir().ok_or(ConfigError::CannotDetermineConfigDir)?;
        base_config_dir.join(APP_CONFIG_DIR)
    };

    if !config_dir_path.exists() {
        fs::create_dir_all(&config_dir_path)?;
    }

    Ok(config_dir_path.join(CONFIG_FILE_NAME))
}

/// Loads the configuration from the TOML file at the given path,
/// creating it with defaults when missing.
pub fn load_config(config_path: &Path) -> Result<Config, ConfigError> {
    if config_path.exists() {
        let config_content = fs::read_to_string(config_path)?;
        let config: Config = toml::from_str(&config_content).map_err(ConfigError::TomlParse)?;
        Ok(config)
    } else {
        let default_config = Config::default();
        save_config(config_path, &default_config)?;
        Ok(default_config)
    }
}

/// Saves the configuration to the TOML file.
pub fn save_config(config_path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent_dir) = config_path.parent() {
        if !parent_dir.exists() {
            fs::create_dir_all(parent_dir)?;
        }
    }
    let config_content = toml::to_string_pretty(config).map_err(ConfigError::TomlSerialize)?;
    fs::write(config_path, config_content)?;
    Ok(())
}
