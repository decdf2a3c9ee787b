//! Configuration for ML states and the hosting runtime.
//!
//! Per-state configuration comes from the creation clause of a state
//! (`batch_train_size`). Runtime-wide defaults are loaded from `ML_STATE_*`
//! environment variables or from a TOML file. Invalid environment values fall
//! back to defaults without crashing; invalid creation clauses are rejected.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `ML_STATE_BATCH_TRAIN_SIZE` | 10 | Default records per training batch |
//! | `ML_STATE_LOG_LEVEL` | info | Log filter directive |
//! | `ML_STATE_LOG_FORMAT` | json | `json` or `pretty` |
//! | `ML_STATE_LOG_FILE` | unset | Log file path (stderr if unset) |

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::model::Params;
use crate::telemetry::{LogConfig, LogFormat};

/// Default number of records accumulated per training invocation.
pub const DEFAULT_BATCH_TRAIN_SIZE: usize = 10;

/// Creation clause key for the batch size.
pub const BATCH_TRAIN_SIZE_KEY: &str = "batch_train_size";

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("batch_train_size must be a positive integer, got {0}")]
    InvalidBatchSize(String),

    #[error("Failed to read config file {path}: {message}")]
    File { path: PathBuf, message: String },

    #[error("Failed to parse config file: {0}")]
    Parse(String),
}

/// Configuration owned by a single ML state. Persisted in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MlConfig {
    /// Number of records buffered by `write` before `fit` is called.
    pub batch_train_size: usize,
}

impl Default for MlConfig {
    fn default() -> Self {
        Self { batch_train_size: DEFAULT_BATCH_TRAIN_SIZE }
    }
}

impl MlConfig {
    pub fn new(batch_train_size: usize) -> Result<Self, ConfigError> {
        let config = Self { batch_train_size };
        config.validate()?;
        Ok(config)
    }

    /// Reject a configuration that could never trigger a batch.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_train_size == 0 {
            return Err(ConfigError::InvalidBatchSize("0".into()));
        }
        Ok(())
    }

    /// Parse a creation clause, using the built-in default when absent.
    pub fn from_params(params: &Params) -> Result<Self, ConfigError> {
        Self::from_params_or(params, DEFAULT_BATCH_TRAIN_SIZE)
    }

    /// Parse a creation clause, using `fallback` when the key is absent.
    pub fn from_params_or(params: &Params, fallback: usize) -> Result<Self, ConfigError> {
        let batch_train_size = match params.get(BATCH_TRAIN_SIZE_KEY) {
            None => fallback,
            Some(value) => parse_batch_size(value)?,
        };
        Self::new(batch_train_size)
    }
}

fn parse_batch_size(value: &Value) -> Result<usize, ConfigError> {
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .filter(|n| *n > 0)
        .ok_or_else(|| ConfigError::InvalidBatchSize(value.to_string()))
}

/// Runtime-wide settings for hosts embedding ML states.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub default_batch_train_size: usize,
    pub log: LogConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_batch_train_size: DEFAULT_BATCH_TRAIN_SIZE,
            log: LogConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Parse a creation clause with this runtime's default batch size.
    pub fn ml_config(&self, params: &Params) -> Result<MlConfig, ConfigError> {
        MlConfig::from_params_or(params, self.default_batch_train_size)
    }
}

/// Parse a `usize` env var, returning `default` on missing or invalid.
fn parse_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

fn load_log_config() -> LogConfig {
    let defaults = LogConfig::default();
    let level = std::env::var("ML_STATE_LOG_LEVEL").unwrap_or(defaults.level);
    let format = std::env::var("ML_STATE_LOG_FORMAT")
        .ok()
        .and_then(|f| f.parse::<LogFormat>().ok())
        .unwrap_or(defaults.format);
    let output_path = std::env::var("ML_STATE_LOG_FILE").ok().map(PathBuf::from);
    LogConfig { format, level, output_path }
}

/// Load runtime configuration from environment variables.
///
/// Missing or invalid values fall back to safe defaults without panicking.
pub fn load() -> RuntimeConfig {
    let batch = parse_usize("ML_STATE_BATCH_TRAIN_SIZE", DEFAULT_BATCH_TRAIN_SIZE);
    RuntimeConfig {
        default_batch_train_size: batch.max(1),
        log: load_log_config(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    state: StateSection,
    #[serde(default)]
    logging: LoggingSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StateSection {
    batch_train_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingSection {
    level: Option<String>,
    format: Option<String>,
    file: Option<PathBuf>,
}

/// Parse runtime configuration from TOML text.
pub fn parse_toml(text: &str) -> Result<RuntimeConfig, ConfigError> {
    let file: FileConfig = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let default_batch_train_size = file.state.batch_train_size.unwrap_or(DEFAULT_BATCH_TRAIN_SIZE);
    if default_batch_train_size == 0 {
        return Err(ConfigError::InvalidBatchSize("0".into()));
    }

    let defaults = LogConfig::default();
    let format = match file.logging.format {
        Some(f) => f.parse::<LogFormat>().map_err(ConfigError::Parse)?,
        None => defaults.format,
    };

    Ok(RuntimeConfig {
        default_batch_train_size,
        log: LogConfig {
            format,
            level: file.logging.level.unwrap_or(defaults.level),
            output_path: file.logging.file,
        },
    })
}

/// Load runtime configuration from a TOML file.
pub fn load_file(path: &Path) -> Result<RuntimeConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_toml(&text)
}
