//! # Fulfillment Gateway
//!
//! The authoritative side of every transaction. The engine never mutates
//! local state until the gateway confirms the exchange.
//!
//! ```text
//!   Engine ── make_virtual_transaction(id, cost ids, completer) ──> Gateway
//!     ▲                                                               │
//!     └──────────── completer.resolve(TransactionExchangeData) ───────┘
//! ```
//!
//! Implementations may settle the completer inline (in-process gateway) or
//! later from another task (networked gateway). Timeouts are the gateway's
//! concern; the engine waits for as long as the completer lives.

use thiserror::Error;

use crate::deferred::{Abandoned, Completer};
use crate::result::TransactionExchangeData;

/// Errors a fulfillment gateway reports.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The gateway refused the transaction.
    #[error("{0}")]
    Rejected(String),

    /// The gateway could not be reached.
    #[error("gateway unreachable: {0}")]
    Network(String),

    /// The gateway dropped the request without answering.
    #[error("gateway abandoned the request")]
    Abandoned,
}

impl From<Abandoned> for GatewayError {
    fn from(_: Abandoned) -> Self {
        Self::Abandoned
    }
}

/// Completer type handed to gateway operations.
pub type GatewayCompleter = Completer<TransactionExchangeData, GatewayError>;

/// Authoritative transaction validation and fulfillment.
pub trait FulfillmentGateway: Send + Sync {
    /// Validates and fulfills a virtual transaction paying with `cost_item_ids`.
    fn make_virtual_transaction(
        &self,
        transaction_id: &str,
        cost_item_ids: &[String],
        completer: GatewayCompleter,
    );

    /// Redeems an App Store purchase.
    fn redeem_apple_iap(&self, transaction_id: &str, receipt: &str, completer: GatewayCompleter);

    /// Redeems a Google Play purchase.
    fn redeem_google_iap(
        &self,
        transaction_id: &str,
        purchase_data: &str,
        signature: &str,
        completer: GatewayCompleter,
    );

    /// Redeems a purchase made through the fake development store.
    fn redeem_fake_store_iap(
        &self,
        transaction_id: &str,
        receipt: &str,
        completer: GatewayCompleter,
    );
}
