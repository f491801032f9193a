//! Configuration file support for fitlog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/fitlog/config.toml`.

use crate::summary::MAX_WINDOW_DAYS;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub advice: AdviceConfig,

    #[serde(default)]
    pub summary: SummaryConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Advice service (Gemini) configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdviceConfig {
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How many of the most recent entries go into a coaching request
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            history_limit: default_history_limit(),
        }
    }
}

/// History view configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SummaryConfig {
    #[serde(default = "default_days")]
    pub default_days: u32,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            default_days: default_days(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        PathBuf::from(home).join(".local/share")
    });
    base.join("fitlog")
}

fn default_model() -> String {
    crate::gemini::DEFAULT_MODEL.into()
}

fn default_api_key_env() -> String {
    crate::gemini::API_KEY_ENV.into()
}

fn default_base_url() -> String {
    crate::gemini::API_BASE_URL.into()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_history_limit() -> usize {
    20
}

fn default_days() -> u32 {
    7
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            PathBuf::from(home).join(".config")
        });
        base.join("fitlog").join("config.toml")
    }

    fn validate(&self) -> Result<()> {
        if self.summary.default_days == 0 {
            return Err(Error::Config("summary.default_days must be at least 1".into()));
        }
        if self.summary.default_days > MAX_WINDOW_DAYS {
            return Err(Error::Config(format!(
                "summary.default_days must be at most {}",
                MAX_WINDOW_DAYS
            )));
        }
        if self.advice.timeout_secs == 0 {
            return Err(Error::Config("advice.timeout_secs must be at least 1".into()));
        }
        if self.advice.history_limit == 0 {
            return Err(Error::Config("advice.history_limit must be at least 1".into()));
        }
        if self.advice.model.trim().is_empty() {
            return Err(Error::Config("advice.model must not be empty".into()));
        }
        Ok(())
    }
}
