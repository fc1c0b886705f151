//! # Wallet
//!
//! Per-currency balances for one player.
//!
//! The `*_internal` mutators are reserved for the transaction engine, which
//! only calls them with gateway-confirmed amounts. UI code reads balances and
//! subscribes to [`WalletEvent`]s.

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::catalog::Catalog;
use crate::error::{EconomyError, EconomyResult};
use crate::notify::Listeners;

/// Change notification raised by the wallet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletEvent {
    /// A balance changed.
    BalanceChanged {
        /// Currency key.
        currency: String,
        /// Balance before the change.
        old: u64,
        /// Balance after the change.
        new: u64,
    },
}

/// Balance operations consumed by the transaction engine.
pub trait WalletService: Send + Sync {
    /// Current balance of `currency`.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::UnknownCurrency` for currencies the wallet does not track.
    fn balance(&self, currency: &str) -> EconomyResult<u64>;

    /// Adds `amount` and returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::UnknownCurrency` or `EconomyError::BalanceOverflow`.
    fn add_balance_internal(&self, currency: &str, amount: u64) -> EconomyResult<u64>;

    /// Removes `amount` and returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InsufficientBalance` if the balance would go negative.
    fn remove_balance_internal(&self, currency: &str, amount: u64) -> EconomyResult<u64>;
}

#[derive(Clone, Debug)]
struct Account {
    balance: u64,
    maximum: Option<u64>,
}

/// Frozen copy of every balance, for rollback and comparisons.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletSnapshot {
    balances: HashMap<String, u64>,
}

impl WalletSnapshot {
    /// Balance of `currency` at snapshot time.
    #[must_use]
    pub fn balance(&self, currency: &str) -> Option<u64> {
        self.balances.get(currency).copied()
    }
}

/// In-memory wallet.
#[derive(Debug, Default)]
pub struct Wallet {
    accounts: RwLock<HashMap<String, Account>>,
    listeners: Listeners<WalletEvent>,
}

impl Wallet {
    /// Creates a wallet tracking every catalog currency at its initial balance.
    #[must_use]
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let accounts = catalog
            .currencies()
            .map(|c| {
                (
                    c.key.clone(),
                    Account {
                        balance: c.initial_balance,
                        maximum: c.maximum_balance,
                    },
                )
            })
            .collect();

        Self {
            accounts: RwLock::new(accounts),
            listeners: Listeners::new(),
        }
    }

    /// Subscribes to balance changes.
    pub fn subscribe(&self) -> crossbeam_channel::Receiver<WalletEvent> {
        self.listeners.subscribe()
    }

    /// Overwrites a balance (seeding, admin tools). The cap still applies.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::UnknownCurrency` for untracked currencies.
    pub fn set_balance(&self, currency: &str, balance: u64) -> EconomyResult<u64> {
        let (old, new) = {
            let mut accounts = self.accounts.write();
            let account = accounts
                .get_mut(currency)
                .ok_or_else(|| EconomyError::UnknownCurrency(currency.to_string()))?;
            let old = account.balance;
            account.balance = clamp(balance, account.maximum);
            (old, account.balance)
        };
        self.notify(currency, old, new);
        Ok(new)
    }

    /// Captures every balance.
    #[must_use]
    pub fn snapshot(&self) -> WalletSnapshot {
        WalletSnapshot {
            balances: self
                .accounts
                .read()
                .iter()
                .map(|(k, a)| (k.clone(), a.balance))
                .collect(),
        }
    }

    /// Restores balances from a snapshot. Currencies missing from the
    /// snapshot are left untouched.
    pub fn restore(&self, snapshot: &WalletSnapshot) {
        let mut accounts = self.accounts.write();
        for (key, balance) in &snapshot.balances {
            if let Some(account) = accounts.get_mut(key) {
                account.balance = *balance;
            }
        }
    }

    fn notify(&self, currency: &str, old: u64, new: u64) {
        if old != new {
            self.listeners.publish(&WalletEvent::BalanceChanged {
                currency: currency.to_string(),
                old,
                new,
            });
        }
    }
}

fn clamp(balance: u64, maximum: Option<u64>) -> u64 {
    maximum.map_or(balance, |max| balance.min(max))
}

impl WalletService for Wallet {
    fn balance(&self, currency: &str) -> EconomyResult<u64> {
        self.accounts
            .read()
            .get(currency)
            .map(|a| a.balance)
            .ok_or_else(|| EconomyError::UnknownCurrency(currency.to_string()))
    }

    fn add_balance_internal(&self, currency: &str, amount: u64) -> EconomyResult<u64> {
        let (old, new) = {
            let mut accounts = self.accounts.write();
            let account = accounts
                .get_mut(currency)
                .ok_or_else(|| EconomyError::UnknownCurrency(currency.to_string()))?;
            let raw = account
                .balance
                .checked_add(amount)
                .ok_or_else(|| EconomyError::BalanceOverflow(currency.to_string()))?;
            let old = account.balance;
            account.balance = clamp(raw, account.maximum);
            if account.balance < raw {
                tracing::debug!(
                    "Balance of {} capped at {} ({} requested)",
                    currency,
                    account.balance,
                    raw
                );
            }
            (old, account.balance)
        };
        self.notify(currency, old, new);
        Ok(new)
    }

    fn remove_balance_internal(&self, currency: &str, amount: u64) -> EconomyResult<u64> {
        let (old, new) = {
            let mut accounts = self.accounts.write();
            let account = accounts
                .get_mut(currency)
                .ok_or_else(|| EconomyError::UnknownCurrency(currency.to_string()))?;
            let new = account.balance.checked_sub(amount).ok_or_else(|| {
                EconomyError::InsufficientBalance {
                    currency: currency.to_string(),
                    required: amount,
                    available: account.balance,
                }
            })?;
            let old = account.balance;
            account.balance = new;
            (old, new)
        };
        self.notify(currency, old, new);
        Ok(new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CurrencyDefinition;

    fn wallet() -> Wallet {
        let catalog = Catalog::builder()
            .add_currency(CurrencyDefinition::new("gold", "Gold").with_initial_balance(100))
            .add_currency(
                CurrencyDefinition::new("gems", "Gems")
                    .with_initial_balance(5)
                    .with_maximum_balance(10),
            )
            .build()
            .unwrap();
        Wallet::from_catalog(&catalog)
    }

    #[test]
    fn test_initial_balances() {
        let wallet = wallet();
        assert_eq!(wallet.balance("gold").unwrap(), 100);
        assert_eq!(wallet.balance("gems").unwrap(), 5);
        assert!(matches!(
            wallet.balance("silver"),
            Err(EconomyError::UnknownCurrency(_))
        ));
    }

    #[test]
    fn test_add_and_remove() {
        let wallet = wallet();
        assert_eq!(wallet.add_balance_internal("gold", 50).unwrap(), 150);
        assert_eq!(wallet.remove_balance_internal("gold", 120).unwrap(), 30);
    }

    #[test]
    fn test_remove_insufficient_leaves_balance() {
        let wallet = wallet();
        let result = wallet.remove_balance_internal("gold", 150);
        assert_eq!(
            result.unwrap_err(),
            EconomyError::InsufficientBalance {
                currency: "gold".to_string(),
                required: 150,
                available: 100,
            }
        );
        assert_eq!(wallet.balance("gold").unwrap(), 100);
    }

    #[test]
    fn test_maximum_balance_caps_additions() {
        let wallet = wallet();
        assert_eq!(wallet.add_balance_internal("gems", 100).unwrap(), 10);
    }

    #[test]
    fn test_overflow() {
        let wallet = wallet();
        let result = wallet.add_balance_internal("gold", u64::MAX);
        assert!(matches!(result, Err(EconomyError::BalanceOverflow(_))));
    }

    #[test]
    fn test_change_notifications() {
        let wallet = wallet();
        let events = wallet.subscribe();

        wallet.remove_balance_internal("gold", 40).unwrap();

        assert_eq!(
            events.try_recv().unwrap(),
            WalletEvent::BalanceChanged {
                currency: "gold".to_string(),
                old: 100,
                new: 60,
            }
        );
    }

    #[test]
    fn test_snapshot_restore() {
        let wallet = wallet();
        let snapshot = wallet.snapshot();

        wallet.add_balance_internal("gold", 25).unwrap();
        assert_ne!(wallet.snapshot(), snapshot);

        wallet.restore(&snapshot);
        assert_eq!(wallet.snapshot(), snapshot);
        assert_eq!(snapshot.balance("gold"), Some(100));
    }
}
