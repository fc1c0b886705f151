//! # Economy Error Types
//!
//! All errors that can occur while building the catalog or mutating
//! player state.

use thiserror::Error;

/// Errors that can occur in the economy crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EconomyError {
    /// Attempted to spend more of a currency than the wallet holds.
    #[error("insufficient balance of {currency}: need {required}, have {available}")]
    InsufficientBalance {
        /// The currency that was short.
        currency: String,
        /// The amount required.
        required: u64,
        /// The amount available.
        available: u64,
    },

    /// Currency key not present in the catalog.
    #[error("unknown currency: {0}")]
    UnknownCurrency(String),

    /// Item definition key not present in the catalog.
    #[error("unknown item definition: {0}")]
    UnknownItem(String),

    /// Transaction key not present in the catalog.
    #[error("unknown transaction: {0}")]
    UnknownTransaction(String),

    /// No inventory item instance with this id.
    #[error("item instance not found: {0}")]
    ItemInstanceNotFound(String),

    /// An item instance with this id already exists.
    #[error("duplicate item instance id: {0}")]
    DuplicateInstance(String),

    /// Two catalog entries share a key.
    #[error("duplicate {kind} key: {key}")]
    DuplicateKey {
        /// Which registry the collision happened in.
        kind: &'static str,
        /// The colliding key.
        key: String,
    },

    /// An exchange entry carries a zero amount.
    #[error("exchange entry {key} in {owner} must have a positive amount")]
    InvalidAmount {
        /// Transaction that owns the entry.
        owner: String,
        /// Currency or item key of the entry.
        key: String,
    },

    /// Balance arithmetic overflowed.
    #[error("balance overflow for currency {0}")]
    BalanceOverflow(String),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for economy operations.
pub type EconomyResult<T> = Result<T, EconomyError>;
