//! Configuration
//!
//! Both sections load from a single JSON file; every field has a default.
//! Log verbosity is taken from `RUST_LOG`, not from here.
//!
//! ```json
//! {
//!   "prover": { "artifact_dir": "artifacts", "recipient_binding": "blinded" },
//!   "settlement": { "owner": "0x...", "whitelist": [1998] }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::constants::DEFAULT_CIRCUIT_K;
use crate::prover::pool::default_workers;
use crate::recipient::{Address, RecipientBinding};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProverConfig {
    /// Where `setup` writes and the prover loads proving artifacts
    pub artifact_dir: PathBuf,
    /// Circuit size parameter
    pub k: u32,
    /// Concurrent proofs; the number of cores if unset
    pub workers: Option<usize>,
    pub max_generation_ms: u64,
    pub recipient_binding: RecipientBinding,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("artifacts"),
            k: DEFAULT_CIRCUIT_K,
            workers: None,
            max_generation_ms: 120_000,
            recipient_binding: RecipientBinding::default(),
        }
    }
}

impl ProverConfig {
    pub fn max_generation_time(&self) -> Duration {
        Duration::from_millis(self.max_generation_ms)
    }

    pub fn workers(&self) -> usize {
        self.workers.unwrap_or_else(default_workers).max(1)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    pub owner: Address,
    /// Assets approved at startup
    pub whitelist: Vec<u64>,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            owner: Address::from_bytes([0u8; 20]),
            whitelist: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub prover: ProverConfig,
    pub settlement: SettlementConfig,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(DEFAULT_CIRCUIT_K..=20).contains(&self.prover.k) {
            return Err(ConfigError::Invalid(format!(
                "k must be between {} and 20, got {}",
                DEFAULT_CIRCUIT_K,
                self.prover.k
            )));
        }
        if self.prover.max_generation_ms == 0 {
            return Err(ConfigError::Invalid(
                "max_generation_ms must be positive".to_string(),
            ));
        }
        if self.settlement.whitelist.contains(&0) {
            return Err(ConfigError::Invalid("asset id 0 cannot be whitelisted".to_string()));
        }
        Ok(())
    }
}
