use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{LstmError, Result};
use crate::models::{DEFAULT_LEARNING_RATE, DEFAULT_SEQUENCE_LENGTH};

/// Training configuration loaded from a TOML or JSON file. Missing keys
/// take their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Number of training epochs.
    pub epochs: usize,
    /// Width of the hidden and cell state.
    pub hidden_size: usize,
    /// Observations per input window.
    pub sequence_length: usize,
    pub learning_rate: f64,
    /// Fraction of the series used for training; the rest is held out for
    /// evaluation. `1.0` trains on everything.
    pub train_ratio: f64,
    /// RNG seed. Falls back to `SEED` from the environment when unset.
    pub seed: Option<u64>,
    /// Directory for metrics files. No metrics are written when unset.
    pub log_dir: Option<String>,
    pub experiment: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            epochs: 100,
            hidden_size: 64,
            sequence_length: DEFAULT_SEQUENCE_LENGTH,
            learning_rate: DEFAULT_LEARNING_RATE,
            train_ratio: 1.0,
            seed: None,
            log_dir: None,
            experiment: None,
        }
    }
}

impl Config {
    /// Load configuration from the given path. Supports TOML or JSON based on
    /// the file extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config: Config = if is_json {
            serde_json::from_str(&content)
                .map_err(|e| LstmError::Config(format!("{}: {e}", path.display())))?
        } else {
            toml::from_str(&content)
                .map_err(|e| LstmError::Config(format!("{}: {e}", path.display())))?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(LstmError::Config("epochs must be positive".into()));
        }
        if self.hidden_size == 0 {
            return Err(LstmError::Config("hidden_size must be positive".into()));
        }
        if self.sequence_length == 0 {
            return Err(LstmError::Config("sequence_length must be positive".into()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(LstmError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.train_ratio > 0.0 && self.train_ratio <= 1.0) {
            return Err(LstmError::Config(format!(
                "train_ratio must be in (0, 1], got {}",
                self.train_ratio
            )));
        }
        Ok(())
    }
}
