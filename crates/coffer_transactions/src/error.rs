//! # Transaction Error Types
//!
//! Every failure a transaction can end with. Errors are `Clone` because the
//! same value is stored in the caller's deferred handle AND mirrored on the
//! `Failed` lifecycle event.
//!
//! | Family        | Variants                                                     |
//! |---------------|--------------------------------------------------------------|
//! | Usage         | `Uninitialized`, `AlreadyProcessing`, `Another*InProgress`,  |
//! |               | `NoPurchasingAdapter`, `MissingProductId`, `NoRuntime`       |
//! | Validation    | `InsufficientResources`, `NotEnoughItems`                    |
//! | Platform      | `Platform`, `MissingPurchaseData`, `MalformedReceipt`,       |
//! |               | `UnsupportedPlatform`, `AdapterInitialization`               |
//! | Gateway       | `Gateway`                                                    |
//! | Inconsistency | `UnexpectedPurchase`, `TransactionNotFoundForProduct`        |

use std::fmt;

use coffer_economy::EconomyError;
use thiserror::Error;

use crate::deferred::Abandoned;
use crate::gateway::GatewayError;
use crate::purchasing::StorePlatform;

/// One unmet cost found during local verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Shortfall {
    /// Wallet balance below the currency cost.
    Currency {
        /// Currency key.
        currency: String,
        /// Amount the transaction costs.
        required: u64,
        /// Current balance.
        available: u64,
    },
    /// Fewer item instances than the item cost.
    Item {
        /// Item definition key.
        item: String,
        /// Instances the transaction costs.
        required: u64,
        /// Instances owned.
        available: u64,
    },
}

impl fmt::Display for Shortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Currency {
                currency,
                required,
                available,
            } => write!(
                f,
                "insufficient balance of {currency}: need {required}, have {available}"
            ),
            Self::Item {
                item,
                required,
                available,
            } => write!(
                f,
                "insufficient items of {item}: need {required}, have {available}"
            ),
        }
    }
}

fn join_shortfalls(shortfalls: &[Shortfall]) -> String {
    shortfalls
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors a transaction can fail with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    /// The engine has no fulfillment gateway.
    #[error("transaction engine is not initialized with a fulfillment gateway")]
    Uninitialized,

    /// No async runtime is available to drive the flow.
    #[error("no async runtime available to process {0}")]
    NoRuntime(String),

    /// This very transaction is already in flight.
    #[error("transaction {0} is already being processed")]
    AlreadyProcessing(String),

    /// A different virtual transaction is in flight.
    #[error("cannot begin {requested}: transaction {in_flight} is in progress")]
    AnotherTransactionInProgress {
        /// Transaction that was requested.
        requested: String,
        /// Transaction currently in flight.
        in_flight: String,
    },

    /// A different IAP is in flight.
    #[error("cannot begin {requested}: another purchase ({in_flight}) is in progress")]
    AnotherPurchaseInProgress {
        /// Transaction that was requested.
        requested: String,
        /// Transaction currently in flight.
        in_flight: String,
    },

    /// IAP requested but no purchasing adapter is registered.
    #[error("no purchasing adapter is configured")]
    NoPurchasingAdapter,

    /// IAP transaction has no platform product id.
    #[error("IAP transaction {0} has no product id")]
    MissingProductId(String),

    /// Local cost verification found one or more shortfalls.
    #[error("{}", join_shortfalls(.0))]
    InsufficientResources(Vec<Shortfall>),

    /// Not enough item instances to auto-select the item costs.
    #[error("not enough {item} items: need {required}, found {available}")]
    NotEnoughItems {
        /// Item definition key.
        item: String,
        /// Instances needed.
        required: u64,
        /// Instances available for selection.
        available: u64,
    },

    /// The platform store reported a failed or cancelled purchase.
    #[error("{0}")]
    Platform(String),

    /// The adapter had no purchase data to redeem.
    #[error("no purchase data available for product {0}")]
    MissingPurchaseData(String),

    /// Receipt data did not match the platform's expected shape.
    #[error("malformed receipt for product {product_id}: expected {expected} parts, got {actual}")]
    MalformedReceipt {
        /// Product id of the purchase.
        product_id: String,
        /// Receipt parts the platform requires.
        expected: usize,
        /// Receipt parts received.
        actual: usize,
    },

    /// The adapter's platform has no gateway redeem operation.
    #[error("cannot redeem purchases for platform {0}")]
    UnsupportedPlatform(StorePlatform),

    /// The purchasing adapter failed to initialize.
    #[error("purchasing adapter initialization failed: {0}")]
    AdapterInitialization(String),

    /// The fulfillment gateway rejected or failed the request.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Success callback for a product other than the pending one.
    #[error("received purchase of {received} while {pending} is pending")]
    UnexpectedPurchase {
        /// Product id currently pending.
        pending: String,
        /// Product id the platform reported.
        received: String,
    },

    /// No catalog IAP transaction sells this product id.
    #[error("transaction not found for product id {0}")]
    TransactionNotFoundForProduct(String),

    /// Transaction key not in the catalog.
    #[error("transaction {0} not found in catalog")]
    UnknownTransaction(String),

    /// The producer went away before settling the handle.
    #[error("operation abandoned before completion")]
    Abandoned,

    /// Wallet, inventory or catalog error.
    #[error(transparent)]
    Economy(#[from] EconomyError),
}

impl From<Abandoned> for TransactionError {
    fn from(_: Abandoned) -> Self {
        Self::Abandoned
    }
}
