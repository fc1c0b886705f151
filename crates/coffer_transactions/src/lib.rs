//! # COFFER Transactions
//!
//! The transaction engine: every purchase the player makes, whether paid
//! with in-game resources or real money, goes through here.
//!
//! ## Design Principles
//!
//! 1. **Server authority** - Wallet and inventory change only after the
//!    fulfillment gateway confirms, and only by what it confirmed
//! 2. **One at a time** - At most one virtual transaction and one IAP in flight
//! 3. **Never lose a purchase** - Store successes that arrive unsolicited are
//!    queued and redeemed one by one
//! 4. **Async, not blocking** - Flows are tokio tasks; callers get a
//!    [`Deferred`] handle they can poll or await
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use coffer_economy::{Catalog, Inventory, Wallet};
//! use coffer_transactions::{EngineConfig, LocalFulfillmentGateway, TransactionEngine};
//!
//! let catalog = Arc::new(Catalog::from_file("data/catalog.toml")?);
//! let wallet = Arc::new(Wallet::from_catalog(&catalog));
//! let inventory = Arc::new(Inventory::from_catalog(&catalog));
//!
//! let engine = TransactionEngine::new(
//!     EngineConfig::default(),
//!     Arc::clone(&catalog),
//!     wallet.clone(),
//!     inventory.clone(),
//! );
//! engine.initialize(Arc::new(LocalFulfillmentGateway::new(catalog, wallet, inventory)));
//!
//! let result = engine.begin_transaction_by_key("buy_sword", Vec::new()).wait().await?;
//! ```

#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod deferred;
pub mod engine;
pub mod error;
pub mod events;
pub mod fake_store;
pub mod gateway;
pub mod local_gateway;
pub mod purchasing;
pub mod receipt;
pub mod result;

mod queue;

pub use config::EngineConfig;
pub use deferred::{Abandoned, Completer, Deferred};
pub use engine::{IapOutcome, PendingIapInfo, TransactionEngine, IAP_STEPS, VIRTUAL_STEPS};
pub use error::{Shortfall, TransactionError};
pub use events::TransactionEvent;
pub use fake_store::{FakeStoreAdapter, FakeStoreMode};
pub use gateway::{FulfillmentGateway, GatewayCompleter, GatewayError};
pub use local_gateway::LocalFulfillmentGateway;
pub use purchasing::{
    LocalizedProductInfo, PurchaseData, PurchaseSink, PurchasingAdapter, PurchasingError,
    StorePlatform,
};
pub use receipt::{Payout, Price, ReceiptLine, ReceiptLog, TransactionReceipt};
pub use result::{
    ConfirmedExchange, CurrencyAmount, ItemInstanceRef, TransactionExchangeData, TransactionResult,
};
