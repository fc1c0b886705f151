//! # Exchange Definitions
//!
//! One side (cost or reward) of a catalog transaction.
//!
//! Amounts are always stored positive. Whether an exchange is subtracted
//! or added is decided by the side of the transaction it belongs to.

use serde::{Deserialize, Serialize};

/// An item entry in an exchange: `amount` instances of `item`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemExchange {
    /// Inventory item definition key.
    pub item: String,
    /// Number of instances.
    pub amount: u64,
}

impl ItemExchange {
    /// Creates a new item exchange entry.
    #[must_use]
    pub fn new(item: impl Into<String>, amount: u64) -> Self {
        Self {
            item: item.into(),
            amount,
        }
    }
}

/// A currency entry in an exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyExchange {
    /// Currency key.
    pub currency: String,
    /// Amount of the currency.
    pub amount: u64,
}

impl CurrencyExchange {
    /// Creates a new currency exchange entry.
    #[must_use]
    pub fn new(currency: impl Into<String>, amount: u64) -> Self {
        Self {
            currency: currency.into(),
            amount,
        }
    }
}

/// Ordered item and currency entries forming one side of a transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeDefinition {
    /// Item entries, in authoring order.
    #[serde(default)]
    pub items: Vec<ItemExchange>,
    /// Currency entries, in authoring order.
    #[serde(default)]
    pub currencies: Vec<CurrencyExchange>,
}

impl ExchangeDefinition {
    /// Creates an empty exchange.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item entry.
    #[must_use]
    pub fn with_item(mut self, item: impl Into<String>, amount: u64) -> Self {
        self.items.push(ItemExchange::new(item, amount));
        self
    }

    /// Adds a currency entry.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>, amount: u64) -> Self {
        self.currencies.push(CurrencyExchange::new(currency, amount));
        self
    }

    /// Returns true if the exchange has no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.currencies.is_empty()
    }

    /// Returns true if any item entry is present.
    #[must_use]
    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }

    /// Total number of item instances across all item entries.
    #[must_use]
    pub fn total_item_count(&self) -> u64 {
        self.items.iter().map(|i| i.amount).sum()
    }
}
