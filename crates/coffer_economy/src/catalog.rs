//! # Catalog
//!
//! **Immutable registry of game-design definitions.**
//!
//! The catalog is built once (from code or from a TOML file) and then lives
//! for the whole process. It holds:
//!
//! 1. **Currencies** - with their initial and maximum balances
//! 2. **Inventory items** - the definitions that item instances point at
//! 3. **Transactions** - virtual exchanges and real-money (IAP) purchases
//!
//! ## Invariants
//!
//! - Transaction keys are unique across BOTH transaction variants
//! - Platform product ids are unique across IAP transactions
//! - Every exchange entry points at a known currency or item, with amount > 0
//!
//! ## Example
//!
//! ```toml
//! [[currencies]]
//! key = "gold"
//! display_name = "Gold"
//! initial_balance = 100
//!
//! [[items]]
//! key = "sword"
//! display_name = "Sword"
//!
//! [[virtual_transactions]]
//! key = "buy_sword"
//! display_name = "Buy a sword"
//! costs = { currencies = [{ currency = "gold", amount = 50 }] }
//! rewards = { items = [{ item = "sword", amount = 1 }] }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{EconomyError, EconomyResult};
use crate::exchange::ExchangeDefinition;

/// A currency definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyDefinition {
    /// Unique currency key.
    pub key: String,
    /// Human-readable name.
    pub display_name: String,
    /// Balance a fresh wallet starts with.
    #[serde(default)]
    pub initial_balance: u64,
    /// Balance cap, if any.
    #[serde(default)]
    pub maximum_balance: Option<u64>,
}

impl CurrencyDefinition {
    /// Creates a currency with no initial balance and no cap.
    #[must_use]
    pub fn new(key: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            initial_balance: 0,
            maximum_balance: None,
        }
    }

    /// Sets the initial balance.
    #[must_use]
    pub const fn with_initial_balance(mut self, balance: u64) -> Self {
        self.initial_balance = balance;
        self
    }

    /// Sets the balance cap.
    #[must_use]
    pub const fn with_maximum_balance(mut self, maximum: u64) -> Self {
        self.maximum_balance = Some(maximum);
        self
    }
}

/// An inventory item definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItemDefinition {
    /// Unique item key.
    pub key: String,
    /// Human-readable name.
    pub display_name: String,
}

impl InventoryItemDefinition {
    /// Creates an item definition.
    #[must_use]
    pub fn new(key: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
        }
    }
}

/// A transaction paid with in-game currencies and items.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualTransaction {
    /// Unique transaction key.
    pub key: String,
    /// Human-readable name.
    pub display_name: String,
    /// What the player pays.
    #[serde(default)]
    pub costs: ExchangeDefinition,
    /// What the player receives.
    #[serde(default)]
    pub rewards: ExchangeDefinition,
}

impl VirtualTransaction {
    /// Creates a virtual transaction.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        display_name: impl Into<String>,
        costs: ExchangeDefinition,
        rewards: ExchangeDefinition,
    ) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            costs,
            rewards,
        }
    }
}

/// A transaction paid with real money through a platform store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IapTransaction {
    /// Unique transaction key.
    pub key: String,
    /// Human-readable name.
    pub display_name: String,
    /// Platform store product identifier.
    #[serde(default)]
    pub product_id: Option<String>,
    /// What the player receives.
    #[serde(default)]
    pub rewards: ExchangeDefinition,
}

impl IapTransaction {
    /// Creates an IAP transaction.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        display_name: impl Into<String>,
        product_id: Option<String>,
        rewards: ExchangeDefinition,
    ) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            product_id,
            rewards,
        }
    }
}

/// Which flavour of transaction a definition is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    /// Paid with in-game resources.
    Virtual,
    /// Paid with real money.
    Iap,
}

/// A catalog transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionDefinition {
    /// Virtual transaction.
    Virtual(VirtualTransaction),
    /// In-app purchase.
    Iap(IapTransaction),
}

/// Shared empty exchange returned as the cost side of IAP transactions.
static NO_COSTS: ExchangeDefinition = ExchangeDefinition {
    items: Vec::new(),
    currencies: Vec::new(),
};

impl TransactionDefinition {
    /// Unique key of the transaction.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Virtual(v) => &v.key,
            Self::Iap(i) => &i.key,
        }
    }

    /// Human-readable name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::Virtual(v) => &v.display_name,
            Self::Iap(i) => &i.display_name,
        }
    }

    /// Variant of this transaction.
    #[must_use]
    pub const fn kind(&self) -> TransactionKind {
        match self {
            Self::Virtual(_) => TransactionKind::Virtual,
            Self::Iap(_) => TransactionKind::Iap,
        }
    }

    /// Cost side. Always empty for IAP transactions.
    #[must_use]
    pub fn costs(&self) -> &ExchangeDefinition {
        match self {
            Self::Virtual(v) => &v.costs,
            Self::Iap(_) => &NO_COSTS,
        }
    }

    /// Reward side.
    #[must_use]
    pub fn rewards(&self) -> &ExchangeDefinition {
        match self {
            Self::Virtual(v) => &v.rewards,
            Self::Iap(i) => &i.rewards,
        }
    }

    /// Platform product id, for IAP transactions that have one.
    #[must_use]
    pub fn product_id(&self) -> Option<&str> {
        match self {
            Self::Virtual(_) => None,
            Self::Iap(i) => i.product_id.as_deref(),
        }
    }
}

/// On-disk layout of a catalog file.
#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    currencies: Vec<CurrencyDefinition>,
    #[serde(default)]
    items: Vec<InventoryItemDefinition>,
    #[serde(default)]
    virtual_transactions: Vec<VirtualTransaction>,
    #[serde(default)]
    iap_transactions: Vec<IapTransaction>,
}

/// Collects definitions and validates them into a [`Catalog`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    currencies: Vec<CurrencyDefinition>,
    items: Vec<InventoryItemDefinition>,
    transactions: Vec<TransactionDefinition>,
}

impl CatalogBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a currency definition.
    #[must_use]
    pub fn add_currency(mut self, currency: CurrencyDefinition) -> Self {
        self.currencies.push(currency);
        self
    }

    /// Adds an inventory item definition.
    #[must_use]
    pub fn add_item(mut self, item: InventoryItemDefinition) -> Self {
        self.items.push(item);
        self
    }

    /// Adds a virtual transaction.
    #[must_use]
    pub fn add_virtual_transaction(mut self, transaction: VirtualTransaction) -> Self {
        self.transactions
            .push(TransactionDefinition::Virtual(transaction));
        self
    }

    /// Adds an IAP transaction.
    #[must_use]
    pub fn add_iap_transaction(mut self, transaction: IapTransaction) -> Self {
        self.transactions.push(TransactionDefinition::Iap(transaction));
        self
    }

    /// Validates every definition and builds the catalog.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::DuplicateKey` on colliding keys or product ids,
    /// `UnknownCurrency`/`UnknownItem` for dangling exchange references,
    /// `InvalidAmount` for zero amounts and `InvalidConfig` for empty keys.
    pub fn build(self) -> EconomyResult<Catalog> {
        let mut catalog = Catalog::default();

        for currency in self.currencies {
            require_key("currency", &currency.key)?;
            if catalog.currencies.contains_key(&currency.key) {
                return Err(duplicate("currency", &currency.key));
            }
            catalog.currency_order.push(currency.key.clone());
            catalog.currencies.insert(currency.key.clone(), currency);
        }

        for item in self.items {
            require_key("item", &item.key)?;
            if catalog.items.contains_key(&item.key) {
                return Err(duplicate("item", &item.key));
            }
            catalog.item_order.push(item.key.clone());
            catalog.items.insert(item.key.clone(), item);
        }

        for transaction in self.transactions {
            let key = transaction.key().to_string();
            require_key("transaction", &key)?;
            if catalog.transactions.contains_key(&key) {
                return Err(duplicate("transaction", &key));
            }

            catalog.validate_exchange(&key, transaction.costs())?;
            catalog.validate_exchange(&key, transaction.rewards())?;

            if let Some(product_id) = transaction.product_id() {
                require_key("product id", product_id)?;
                if catalog.products.contains_key(product_id) {
                    return Err(duplicate("product id", product_id));
                }
                catalog
                    .products
                    .insert(product_id.to_string(), key.clone());
            }

            catalog.transaction_order.push(key.clone());
            catalog.transactions.insert(key, Arc::new(transaction));
        }

        tracing::debug!(
            "Catalog built: {} currencies, {} items, {} transactions",
            catalog.currencies.len(),
            catalog.items.len(),
            catalog.transactions.len()
        );

        Ok(catalog)
    }
}

fn require_key(kind: &'static str, key: &str) -> EconomyResult<()> {
    if key.trim().is_empty() {
        return Err(EconomyError::InvalidConfig(format!("{kind} key must not be empty")));
    }
    Ok(())
}

fn duplicate(kind: &'static str, key: &str) -> EconomyError {
    EconomyError::DuplicateKey {
        kind,
        key: key.to_string(),
    }
}

/// The immutable catalog.
#[derive(Debug, Default)]
pub struct Catalog {
    currencies: HashMap<String, CurrencyDefinition>,
    currency_order: Vec<String>,
    items: HashMap<String, InventoryItemDefinition>,
    item_order: Vec<String>,
    transactions: HashMap<String, Arc<TransactionDefinition>>,
    transaction_order: Vec<String>,
    /// Product id -> transaction key.
    products: HashMap<String, String>,
}

impl Catalog {
    /// Starts building a catalog.
    #[must_use]
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// Parses and validates a catalog from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConfig` on malformed TOML, or any
    /// validation error from [`CatalogBuilder::build`].
    pub fn from_toml_str(text: &str) -> EconomyResult<Self> {
        let file: CatalogFile =
            toml::from_str(text).map_err(|e| EconomyError::InvalidConfig(e.to_string()))?;

        let mut builder = CatalogBuilder::new();
        builder.currencies = file.currencies;
        builder.items = file.items;
        builder.transactions = file
            .virtual_transactions
            .into_iter()
            .map(TransactionDefinition::Virtual)
            .chain(file.iap_transactions.into_iter().map(TransactionDefinition::Iap))
            .collect();
        builder.build()
    }

    /// Loads a catalog from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConfig` if the file cannot be read,
    /// or any error from [`Catalog::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> EconomyResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EconomyError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    fn validate_exchange(&self, owner: &str, exchange: &ExchangeDefinition) -> EconomyResult<()> {
        for entry in &exchange.currencies {
            if !self.currencies.contains_key(&entry.currency) {
                return Err(EconomyError::UnknownCurrency(entry.currency.clone()));
            }
            if entry.amount == 0 {
                return Err(EconomyError::InvalidAmount {
                    owner: owner.to_string(),
                    key: entry.currency.clone(),
                });
            }
        }
        for entry in &exchange.items {
            if !self.items.contains_key(&entry.item) {
                return Err(EconomyError::UnknownItem(entry.item.clone()));
            }
            if entry.amount == 0 {
                return Err(EconomyError::InvalidAmount {
                    owner: owner.to_string(),
                    key: entry.item.clone(),
                });
            }
        }
        Ok(())
    }

    /// Looks up a currency.
    #[must_use]
    pub fn currency(&self, key: &str) -> Option<&CurrencyDefinition> {
        self.currencies.get(key)
    }

    /// Looks up an inventory item definition.
    #[must_use]
    pub fn item(&self, key: &str) -> Option<&InventoryItemDefinition> {
        self.items.get(key)
    }

    /// Looks up a transaction.
    #[must_use]
    pub fn transaction(&self, key: &str) -> Option<Arc<TransactionDefinition>> {
        self.transactions.get(key).cloned()
    }

    /// Finds the IAP transaction sold under a platform product id.
    #[must_use]
    pub fn find_iap_by_product_id(&self, product_id: &str) -> Option<Arc<TransactionDefinition>> {
        self.products
            .get(product_id)
            .and_then(|key| self.transaction(key))
    }

    /// Currencies in authoring order.
    pub fn currencies(&self) -> impl Iterator<Item = &CurrencyDefinition> {
        self.currency_order
            .iter()
            .filter_map(|key| self.currencies.get(key))
    }

    /// Item definitions in authoring order.
    pub fn items(&self) -> impl Iterator<Item = &InventoryItemDefinition> {
        self.item_order.iter().filter_map(|key| self.items.get(key))
    }

    /// Transactions in authoring order.
    pub fn transactions(&self) -> impl Iterator<Item = &Arc<TransactionDefinition>> {
        self.transaction_order
            .iter()
            .filter_map(|key| self.transactions.get(key))
    }
}
