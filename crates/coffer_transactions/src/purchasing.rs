//! # Purchasing Adapter
//!
//! Seam between the engine and a platform's real-money store SDK.
//! Exactly one adapter is registered per engine; swapping platforms means
//! swapping the adapter implementation.
//!
//! The adapter reports purchase outcomes through the [`PurchaseSink`] it
//! receives on initialization:
//!
//! - `purchase_succeeded` queues the product on the purchase queue, which
//!   redeems it through the engine one purchase at a time
//! - `purchase_failed` tells the engine the in-flight purchase failed

use std::fmt;
use std::sync::Weak;

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::deferred::{Abandoned, Completer};
use crate::engine::TransactionEngine;

/// Which store an adapter talks to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StorePlatform {
    /// Apple App Store.
    AppleAppStore,
    /// Google Play.
    GooglePlay,
    /// Development store with simulated purchases.
    FakeStore,
    /// Any other store; the gateway cannot redeem these.
    Other(String),
}

impl StorePlatform {
    /// Returns true for the Apple App Store.
    #[must_use]
    pub const fn is_apple_ios(&self) -> bool {
        matches!(self, Self::AppleAppStore)
    }

    /// Returns true for Google Play.
    #[must_use]
    pub const fn is_google_play(&self) -> bool {
        matches!(self, Self::GooglePlay)
    }

    /// Returns true for the fake store.
    #[must_use]
    pub const fn is_fake_store(&self) -> bool {
        matches!(self, Self::FakeStore)
    }

    /// Receipt parts the gateway needs for this platform.
    #[must_use]
    pub const fn receipt_arity(&self) -> Option<usize> {
        match self {
            Self::AppleAppStore | Self::FakeStore => Some(1),
            Self::GooglePlay => Some(2),
            Self::Other(_) => None,
        }
    }
}

impl fmt::Display for StorePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AppleAppStore => f.write_str("apple-app-store"),
            Self::GooglePlay => f.write_str("google-play"),
            Self::FakeStore => f.write_str("fake-store"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// Receipt of the purchase the adapter is currently holding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PurchaseData {
    /// Product that was bought.
    pub product_id: String,
    /// Platform-specific receipt parts (Apple: receipt; Google: data, signature).
    pub receipt_parts: Vec<String>,
}

/// Store-localized product information.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalizedProductInfo {
    /// Localized product name.
    pub name: String,
    /// Localized, formatted price.
    pub price: String,
}

/// Errors a purchasing adapter reports.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PurchasingError {
    /// The store could not be reached or refused to initialize.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The adapter is not initialized.
    #[error("purchasing adapter is not initialized")]
    NotInitialized,

    /// The adapter dropped the request without answering.
    #[error("purchasing adapter abandoned the request")]
    Abandoned,
}

impl From<Abandoned> for PurchasingError {
    fn from(_: Abandoned) -> Self {
        Self::Abandoned
    }
}

/// Binding to a platform store.
pub trait PurchasingAdapter: Send + Sync {
    /// Store this adapter talks to.
    fn platform(&self) -> StorePlatform;

    /// Connects to the store. Settle `completer` when initialization ends;
    /// keep `sink` to report purchase outcomes.
    fn initialize(&self, sink: PurchaseSink, completer: Completer<(), PurchasingError>);

    /// Disconnects from the store and drops the sink.
    fn uninitialize(&self);

    /// Starts the platform purchase flow for `product_id`.
    fn begin_purchase(&self, product_id: &str, payload: Option<&str>);

    /// Receipt data of the unconsumed purchase of `product_id`.
    fn current_purchase_data(&self, product_id: &str) -> Option<PurchaseData>;

    /// Marks the purchase consumed. Must tolerate repeated calls.
    fn complete_pending_purchase(&self, product_id: &str);

    /// Asks the store to replay past purchases.
    fn restore_purchases(&self);

    /// Localized name and price of a product.
    fn localized_product_info(&self, product_id: &str) -> Option<LocalizedProductInfo>;
}

/// Adapter's handle back into the engine.
#[derive(Clone, Debug)]
pub struct PurchaseSink {
    queue: UnboundedSender<String>,
    engine: Weak<TransactionEngine>,
}

impl PurchaseSink {
    pub(crate) fn new(queue: UnboundedSender<String>, engine: Weak<TransactionEngine>) -> Self {
        Self { queue, engine }
    }

    /// Reports a successful platform purchase. Returns false if the engine
    /// is gone and the purchase could not be queued.
    pub fn purchase_succeeded(&self, product_id: &str) -> bool {
        self.queue.send(product_id.to_string()).is_ok()
    }

    /// Reports a failed or cancelled platform purchase.
    pub fn purchase_failed(&self, product_id: &str, message: &str) {
        if let Some(engine) = self.engine.upgrade() {
            engine.platform_purchase_failure(product_id, message);
        }
    }
}
