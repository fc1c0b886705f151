//! # Local Fulfillment Gateway
//!
//! In-process gateway for offline play, development and tests. It plays the
//! server's role against the same wallet and inventory the engine applies
//! to: it validates, confirms and mints instance ids, but never mutates
//! local state itself. The engine applies what it confirms.
//!
//! Store receipts are accepted as-is (there is no store to verify against),
//! but each receipt is redeemable once.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use coffer_economy::{
    Catalog, ExchangeDefinition, InventoryService, TransactionDefinition, TransactionKind,
    WalletService,
};

use crate::gateway::{FulfillmentGateway, GatewayCompleter, GatewayError};
use crate::result::{
    ConfirmedExchange, CurrencyAmount, ItemInstanceRef, TransactionExchangeData,
};

/// Gateway that fulfills transactions in-process.
pub struct LocalFulfillmentGateway {
    catalog: Arc<Catalog>,
    wallet: Arc<dyn WalletService>,
    inventory: Arc<dyn InventoryService>,
    redeemed: Mutex<HashSet<String>>,
    next_instance: AtomicU64,
}

impl std::fmt::Debug for LocalFulfillmentGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFulfillmentGateway")
            .field("redeemed", &self.redeemed.lock().len())
            .field("next_instance", &self.next_instance.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl LocalFulfillmentGateway {
    /// Creates a gateway over the player's local state.
    #[must_use]
    pub fn new(
        catalog: Arc<Catalog>,
        wallet: Arc<dyn WalletService>,
        inventory: Arc<dyn InventoryService>,
    ) -> Self {
        Self {
            catalog,
            wallet,
            inventory,
            redeemed: Mutex::new(HashSet::new()),
            next_instance: AtomicU64::new(0),
        }
    }

    /// Number of store receipts redeemed so far.
    #[must_use]
    pub fn redeemed_count(&self) -> usize {
        self.redeemed.lock().len()
    }

    fn lookup(
        &self,
        transaction_id: &str,
        kind: TransactionKind,
    ) -> Result<Arc<TransactionDefinition>, GatewayError> {
        let transaction = self.catalog.transaction(transaction_id).ok_or_else(|| {
            GatewayError::Rejected(format!("unknown transaction {transaction_id}"))
        })?;
        if transaction.kind() != kind {
            return Err(GatewayError::Rejected(format!(
                "transaction {transaction_id} is not a {kind:?} transaction"
            )));
        }
        Ok(transaction)
    }

    fn confirm_costs(
        &self,
        costs: &ExchangeDefinition,
        cost_item_ids: &[String],
    ) -> Result<ConfirmedExchange, GatewayError> {
        let mut confirmed = ConfirmedExchange::default();

        for cost in &costs.currencies {
            let balance = self
                .wallet
                .balance(&cost.currency)
                .map_err(|e| GatewayError::Rejected(e.to_string()))?;
            if balance < cost.amount {
                return Err(GatewayError::Rejected(format!(
                    "insufficient balance of {}: need {}, have {}",
                    cost.currency, cost.amount, balance
                )));
            }
            confirmed
                .currencies
                .push(CurrencyAmount::new(cost.currency.clone(), cost.amount));
        }

        let mut seen = HashSet::new();
        let mut per_definition: HashMap<String, u64> = HashMap::new();
        for id in cost_item_ids {
            if !seen.insert(id.as_str()) {
                return Err(GatewayError::Rejected(format!(
                    "item {id} offered more than once"
                )));
            }
            let item = self
                .inventory
                .find_item(id)
                .ok_or_else(|| GatewayError::Rejected(format!("item {id} not found")))?;
            if !costs.items.iter().any(|c| c.item == item.definition) {
                return Err(GatewayError::Rejected(format!(
                    "item {id} ({}) is not part of the cost",
                    item.definition
                )));
            }
            *per_definition.entry(item.definition.clone()).or_default() += 1;
            confirmed
                .items
                .push(ItemInstanceRef::new(item.definition, item.id));
        }

        for cost in &costs.items {
            let offered = per_definition.get(&cost.item).copied().unwrap_or(0);
            if offered != cost.amount {
                return Err(GatewayError::Rejected(format!(
                    "cost requires {} {} items, {} offered",
                    cost.amount, cost.item, offered
                )));
            }
        }

        Ok(confirmed)
    }

    fn mint_rewards(&self, rewards: &ExchangeDefinition) -> ConfirmedExchange {
        let mut confirmed = ConfirmedExchange::default();

        for reward in &rewards.currencies {
            confirmed
                .currencies
                .push(CurrencyAmount::new(reward.currency.clone(), reward.amount));
        }

        for reward in &rewards.items {
            for _ in 0..reward.amount {
                let id = self.mint_instance_id(&reward.item);
                confirmed.items.push(ItemInstanceRef::new(reward.item.clone(), id));
            }
        }

        confirmed
    }

    fn mint_instance_id(&self, definition: &str) -> String {
        loop {
            let n = self.next_instance.fetch_add(1, Ordering::Relaxed) + 1;
            let id = format!("{definition}-{n:06}");
            if self.inventory.find_item(&id).is_none() {
                return id;
            }
        }
    }

    fn redeem(&self, transaction_id: &str, receipt_key: String, completer: GatewayCompleter) {
        let outcome = self
            .lookup(transaction_id, TransactionKind::Iap)
            .and_then(|transaction| {
                if !self.redeemed.lock().insert(receipt_key.clone()) {
                    return Err(GatewayError::Rejected(format!(
                        "receipt for {transaction_id} was already redeemed"
                    )));
                }
                Ok(TransactionExchangeData {
                    cost: ConfirmedExchange::default(),
                    reward: self.mint_rewards(transaction.rewards()),
                })
            });

        match outcome {
            Ok(data) => {
                tracing::debug!("Gateway redeemed {} ({})", transaction_id, receipt_key);
                completer.resolve(data);
            }
            Err(e) => {
                tracing::debug!("Gateway rejected redemption of {}: {}", transaction_id, e);
                completer.reject(e);
            }
        }
    }
}

fn require_part(name: &str, value: &str) -> Result<(), GatewayError> {
    if value.trim().is_empty() {
        Err(GatewayError::Rejected(format!("empty {name}")))
    } else {
        Ok(())
    }
}

impl FulfillmentGateway for LocalFulfillmentGateway {
    fn make_virtual_transaction(
        &self,
        transaction_id: &str,
        cost_item_ids: &[String],
        completer: GatewayCompleter,
    ) {
        let outcome = self
            .lookup(transaction_id, TransactionKind::Virtual)
            .and_then(|transaction| {
                let cost = self.confirm_costs(transaction.costs(), cost_item_ids)?;
                let reward = self.mint_rewards(transaction.rewards());
                Ok(TransactionExchangeData { cost, reward })
            });

        match outcome {
            Ok(data) => completer.resolve(data),
            Err(e) => {
                tracing::debug!("Gateway rejected {}: {}", transaction_id, e);
                completer.reject(e);
            }
        }
    }

    fn redeem_apple_iap(&self, transaction_id: &str, receipt: &str, completer: GatewayCompleter) {
        if let Err(e) = require_part("receipt", receipt) {
            return completer.reject(e);
        }
        self.redeem(transaction_id, format!("apple:{receipt}"), completer);
    }

    fn redeem_google_iap(
        &self,
        transaction_id: &str,
        purchase_data: &str,
        signature: &str,
        completer: GatewayCompleter,
    ) {
        if let Err(e) =
            require_part("purchase data", purchase_data).and(require_part("signature", signature))
        {
            return completer.reject(e);
        }
        self.redeem(transaction_id, format!("google:{purchase_data}"), completer);
    }

    fn redeem_fake_store_iap(
        &self,
        transaction_id: &str,
        receipt: &str,
        completer: GatewayCompleter,
    ) {
        if let Err(e) = require_part("receipt", receipt) {
            return completer.reject(e);
        }
        self.redeem(transaction_id, format!("fake:{receipt}"), completer);
    }
}
