//! # COFFER Economy
//!
//! Static game-design data and the mutable player state it describes.
//!
//! ## Design Principles
//!
//! 1. **Immutable catalog** - Definitions are built once and shared read-only
//! 2. **Integer amounts** - Balances and exchange amounts are `u64`, never floats
//! 3. **Single writer** - Wallet and inventory are mutated only through their
//!    `*_internal` operations, which belong to the transaction engine
//! 4. **External configuration** - All design data lives in TOML files
//!
//! ## Example
//!
//! ```rust,ignore
//! use coffer_economy::{Catalog, Inventory, Wallet, WalletService};
//!
//! let catalog = Catalog::from_file("data/catalog.toml")?;
//! let wallet = Wallet::from_catalog(&catalog);
//! let inventory = Inventory::from_catalog(&catalog);
//!
//! let gold = wallet.balance("gold")?;
//! ```

#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod catalog;
pub mod error;
pub mod exchange;
pub mod inventory;
pub mod notify;
pub mod wallet;

pub use catalog::{
    Catalog, CatalogBuilder, CurrencyDefinition, IapTransaction, InventoryItemDefinition,
    TransactionDefinition, TransactionKind, VirtualTransaction,
};
pub use error::{EconomyError, EconomyResult};
pub use exchange::{CurrencyExchange, ExchangeDefinition, ItemExchange};
pub use inventory::{Inventory, InventoryEvent, InventoryItem, InventoryService, InventorySnapshot};
pub use notify::Listeners;
pub use wallet::{Wallet, WalletEvent, WalletService, WalletSnapshot};
