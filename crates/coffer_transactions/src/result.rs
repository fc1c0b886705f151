//! # Confirmed Exchange Data
//!
//! What the fulfillment gateway actually confirmed, and what the engine
//! hands back to callers. Nothing here is ever speculative: these values
//! are built only from a successful gateway response.

use serde::Serialize;

/// A confirmed currency movement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CurrencyAmount {
    /// Currency key.
    pub currency: String,
    /// Amount moved (always positive; direction comes from the side).
    pub amount: u64,
}

impl CurrencyAmount {
    /// Creates a currency amount.
    #[must_use]
    pub fn new(currency: impl Into<String>, amount: u64) -> Self {
        Self {
            currency: currency.into(),
            amount,
        }
    }
}

/// A confirmed item instance movement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ItemInstanceRef {
    /// Item definition key.
    pub definition: String,
    /// Instance id removed or created.
    pub instance_id: String,
}

impl ItemInstanceRef {
    /// Creates an item instance reference.
    #[must_use]
    pub fn new(definition: impl Into<String>, instance_id: impl Into<String>) -> Self {
        Self {
            definition: definition.into(),
            instance_id: instance_id.into(),
        }
    }
}

/// One side of a confirmed exchange.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConfirmedExchange {
    /// Currency movements.
    pub currencies: Vec<CurrencyAmount>,
    /// Item instance movements.
    pub items: Vec<ItemInstanceRef>,
}

impl ConfirmedExchange {
    /// Returns true if nothing moved on this side.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty() && self.items.is_empty()
    }

    /// Total confirmed amount of `currency`.
    #[must_use]
    pub fn currency_total(&self, currency: &str) -> u64 {
        self.currencies
            .iter()
            .filter(|c| c.currency == currency)
            .map(|c| c.amount)
            .sum()
    }

    /// Instance ids of `definition`, in confirmation order.
    #[must_use]
    pub fn instances_of(&self, definition: &str) -> Vec<&str> {
        self.items
            .iter()
            .filter(|i| i.definition == definition)
            .map(|i| i.instance_id.as_str())
            .collect()
    }
}

/// Gateway payload: the exchange as fulfilled server-side.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TransactionExchangeData {
    /// What was debited.
    pub cost: ConfirmedExchange,
    /// What was credited.
    pub reward: ConfirmedExchange,
}

/// Final outcome of a successful transaction, handed to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransactionResult {
    /// Key of the transaction that completed.
    pub transaction: String,
    /// Confirmed costs (always empty for IAP).
    pub costs: ConfirmedExchange,
    /// Confirmed rewards.
    pub rewards: ConfirmedExchange,
}
