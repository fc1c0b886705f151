//! # Engine Configuration
//!
//! Loaded once at startup from TOML:
//!
//! ```toml
//! poll_interval_ms = 16
//! receipt_history = 64
//! purchase_payload = "coffer"
//! ```

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use coffer_economy::EconomyError;

use crate::error::TransactionError;

/// Tunables of the transaction engine.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Interval between condition polls while a flow waits (ms).
    /// Zero yields to the runtime instead of sleeping.
    pub poll_interval_ms: u64,
    /// Number of receipts kept in memory.
    pub receipt_history: usize,
    /// Developer payload passed to `begin_purchase`.
    pub purchase_payload: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 16, // one frame at 60Hz
            receipt_history: 64,
            purchase_payload: None,
        }
    }
}

impl EngineConfig {
    /// Parses a config from TOML text. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `TransactionError::Economy(InvalidConfig)` on malformed TOML.
    pub fn from_toml_str(text: &str) -> Result<Self, TransactionError> {
        toml::from_str(text).map_err(|e| EconomyError::InvalidConfig(e.to_string()).into())
    }

    /// Loads a config from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `TransactionError::Economy(InvalidConfig)` if the file cannot
    /// be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TransactionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EconomyError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Poll interval as a duration.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Config for tests: yield instead of sleeping.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            poll_interval_ms: 0,
            ..Self::default()
        }
    }
}
