//! Configuration loading and config file resolution
//!
//! Learner-wide defaults live in a small TOML document:
//!
//! ```toml
//! seed = 7
//!
//! [split]
//! transformer = 0.5
//! voter = 0.3
//! decider = 0.2
//!
//! [transformer]
//! class = "mean-centering"
//!
//! [voter]
//! class = "nearest-centroid"
//! kwargs = { smoothing = 0.1 }
//!
//! [decider]
//! class = "vote-average"
//! kwargs = {}
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! Every section is optional. A role whose `class` or `kwargs` is absent simply has no
//! learner-wide default for that field.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "LIFELONG_CONFIG";

/// Learner configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearnerConfig {
    /// Seed for the sample partitioner (entropy when absent)
    #[serde(default)]
    pub seed: Option<u64>,

    /// Learner-wide default transformer/voter/decider split
    #[serde(default)]
    pub split: Option<SplitConfig>,

    /// Transformer defaults
    #[serde(default)]
    pub transformer: RoleConfig,

    /// Voter defaults
    #[serde(default)]
    pub voter: RoleConfig,

    /// Decider defaults
    #[serde(default)]
    pub decider: RoleConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Default class name and constructor kwargs for one model role
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Catalog name of the model class
    #[serde(default)]
    pub class: Option<String>,

    /// Constructor keyword arguments, passed through untouched
    #[serde(default)]
    pub kwargs: Option<Map<String, Value>>,
}

/// Fractions of a task's samples given to each model role
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    pub transformer: f64,
    pub voter: f64,
    pub decider: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LearnerConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: LearnerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate the TOML file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Reject split fractions that cannot describe a sample allocation
    pub fn validate(&self) -> Result<()> {
        if let Some(split) = &self.split {
            for (name, fraction) in [
                ("transformer", split.transformer),
                ("voter", split.voter),
                ("decider", split.decider),
            ] {
                if !(0.0..=1.0).contains(&fraction) {
                    return Err(Error::Config(format!(
                        "split.{} must be between 0 and 1, got {}",
                        name, fraction
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Config file resolution in priority order:
/// 1. Explicit path (highest priority, must exist)
/// 2. `LIFELONG_CONFIG` environment variable
/// 3. `<user config dir>/lifelong/config.toml`
/// 4. Built-in defaults (every role unset)
pub fn load_config(explicit: Option<&Path>) -> Result<LearnerConfig> {
    if let Some(path) = explicit {
        debug!("Loading learner config from explicit path {}", path.display());
        return LearnerConfig::load(path);
    }

    match resolve_config_path() {
        Some(path) => {
            debug!("Loading learner config from {}", path.display());
            LearnerConfig::load(&path)
        }
        None => {
            debug!("No learner config file found, using built-in defaults");
            Ok(LearnerConfig::default())
        }
    }
}

/// Locate an implicit config file, if any exists
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        warn!(
            "{} points at missing file {}, falling back",
            CONFIG_ENV_VAR,
            path.display()
        );
    }

    dirs::config_dir()
        .map(|d| d.join("lifelong").join("config.toml"))
        .filter(|p| p.exists())
}
