//! # Transaction Engine
//!
//! Orchestrates every purchase the player makes.
//!
//! ## Flows
//!
//! ```text
//! VIRTUAL (3 steps)
//!   Init ── verify costs ──> CostVerified ── gateway ──> Fulfilled ── apply ──> Done
//!     └────────── any failure ──> Rejected (no local state touched)
//!
//! IAP (4 steps)
//!   Init ── begin_purchase ──> AwaitingPlatform ── success callback ──> AwaitingGateway
//!     ── redeem ──> Fulfilled ── apply rewards + finalize ──> Done
//! ```
//!
//! ## Concurrency
//!
//! At most one virtual transaction and one IAP are in flight at any time,
//! tracked in a single mutex-guarded slot table. Flows run as tokio tasks;
//! waiting on a gateway or platform suspends the task, never the thread.
//! Local wallet and inventory state is mutated only after the gateway
//! confirms, and only with what the gateway confirmed.

mod flow;
mod iap_flow;
mod slots;
mod virtual_flow;

pub use slots::{IapOutcome, PendingIapInfo};

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use coffer_economy::{
    Catalog, ExchangeDefinition, InventoryService, Listeners, TransactionDefinition,
    TransactionKind, WalletService,
};

use crate::config::EngineConfig;
use crate::deferred::{self, Deferred};
use crate::error::{Shortfall, TransactionError};
use crate::events::TransactionEvent;
use crate::gateway::FulfillmentGateway;
use crate::purchasing::{LocalizedProductInfo, PurchaseSink, PurchasingAdapter, PurchasingError};
use crate::queue;
use crate::receipt::{Payout, Price, ReceiptLog, TransactionReceipt};
use crate::result::{ConfirmedExchange, TransactionResult};

use flow::Flow;
use slots::{InFlight, PendingIap};

/// Steps reported by a virtual transaction.
pub const VIRTUAL_STEPS: u32 = 3;

/// Steps reported by an IAP transaction.
pub const IAP_STEPS: u32 = 4;

struct AdapterSlot {
    generation: u64,
    adapter: Arc<dyn PurchasingAdapter>,
}

/// The transaction engine.
///
/// Always held in an `Arc`: flows and the purchase queue keep references
/// to it while they run.
pub struct TransactionEngine {
    config: EngineConfig,
    catalog: Arc<Catalog>,
    wallet: Arc<dyn WalletService>,
    inventory: Arc<dyn InventoryService>,
    gateway: RwLock<Option<Arc<dyn FulfillmentGateway>>>,
    purchasing: RwLock<Option<AdapterSlot>>,
    adapter_generation: AtomicU64,
    in_flight: Mutex<InFlight>,
    listeners: Listeners<TransactionEvent>,
    receipts: Mutex<ReceiptLog>,
    receipt_sequence: AtomicU64,
}

impl fmt::Debug for TransactionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionEngine")
            .field("config", &self.config)
            .field("initialized", &self.is_initialized())
            .field("has_purchasing_adapter", &self.purchasing.read().is_some())
            .field("in_flight", &*self.in_flight.lock())
            .finish_non_exhaustive()
    }
}

impl TransactionEngine {
    /// Creates an engine over the given catalog and local state.
    ///
    /// The engine starts uninitialized: every transaction is rejected until
    /// [`initialize`](Self::initialize) supplies a fulfillment gateway.
    #[must_use]
    pub fn new(
        config: EngineConfig,
        catalog: Arc<Catalog>,
        wallet: Arc<dyn WalletService>,
        inventory: Arc<dyn InventoryService>,
    ) -> Arc<Self> {
        let receipts = ReceiptLog::new(config.receipt_history);
        Arc::new(Self {
            config,
            catalog,
            wallet,
            inventory,
            gateway: RwLock::new(None),
            purchasing: RwLock::new(None),
            adapter_generation: AtomicU64::new(0),
            in_flight: Mutex::new(InFlight::default()),
            listeners: Listeners::new(),
            receipts: Mutex::new(receipts),
            receipt_sequence: AtomicU64::new(0),
        })
    }

    /// Installs the fulfillment gateway.
    pub fn initialize(&self, gateway: Arc<dyn FulfillmentGateway>) {
        *self.gateway.write() = Some(gateway);
        tracing::info!("Transaction engine initialized");
    }

    /// Removes the gateway. Flows already running keep the gateway they
    /// started with.
    pub fn uninitialize(&self) {
        *self.gateway.write() = None;
        tracing::info!("Transaction engine uninitialized");
    }

    /// Returns true once a gateway is installed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.gateway.read().is_some()
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Catalog the engine resolves transactions from.
    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Subscribes to lifecycle events.
    pub fn subscribe(&self) -> crossbeam_channel::Receiver<TransactionEvent> {
        self.listeners.subscribe()
    }

    /// Starts a transaction.
    ///
    /// `cost_item_ids` names the item instances to pay with. Leave it empty
    /// to have them picked from inventory, oldest first. IAP transactions
    /// ignore it.
    ///
    /// Guard failures (uninitialized engine, a transaction already in
    /// flight) return an already-rejected handle and publish no event.
    pub fn begin_transaction(
        self: &Arc<Self>,
        transaction: Arc<TransactionDefinition>,
        cost_item_ids: Vec<String>,
    ) -> Deferred<TransactionResult> {
        let Some(gateway) = self.gateway() else {
            tracing::warn!(
                "Rejected {}: engine is not initialized",
                transaction.key()
            );
            return Deferred::rejected(TransactionError::Uninitialized);
        };

        let Ok(runtime) = Handle::try_current() else {
            tracing::error!("Rejected {}: no async runtime", transaction.key());
            return Deferred::rejected(TransactionError::NoRuntime(
                transaction.key().to_string(),
            ));
        };

        match transaction.kind() {
            TransactionKind::Virtual => {
                self.begin_virtual(&runtime, gateway, transaction, cost_item_ids)
            }
            TransactionKind::Iap => self.begin_iap(&runtime, gateway, transaction),
        }
    }

    /// Starts the catalog transaction `key`.
    pub fn begin_transaction_by_key(
        self: &Arc<Self>,
        key: &str,
        cost_item_ids: Vec<String>,
    ) -> Deferred<TransactionResult> {
        match self.catalog.transaction(key) {
            Some(transaction) => self.begin_transaction(transaction, cost_item_ids),
            None => Deferred::rejected(TransactionError::UnknownTransaction(key.to_string())),
        }
    }

    fn begin_virtual(
        self: &Arc<Self>,
        runtime: &Handle,
        gateway: Arc<dyn FulfillmentGateway>,
        transaction: Arc<TransactionDefinition>,
        cost_item_ids: Vec<String>,
    ) -> Deferred<TransactionResult> {
        let key = transaction.key().to_string();
        {
            let mut in_flight = self.in_flight.lock();
            match in_flight.virtual_txn.as_deref() {
                Some(current) if current == key => {
                    tracing::warn!("Rejected {}: already processing", key);
                    return Deferred::rejected(TransactionError::AlreadyProcessing(key));
                }
                Some(current) => {
                    tracing::warn!("Rejected {}: {} is in progress", key, current);
                    return Deferred::rejected(TransactionError::AnotherTransactionInProgress {
                        requested: key,
                        in_flight: current.to_string(),
                    });
                }
                None => in_flight.virtual_txn = Some(key),
            }
        }

        let (_, completer) = deferred::pair();
        let flow = Flow::start(self, transaction, completer, VIRTUAL_STEPS);
        let handle = flow.handle();
        runtime.spawn(virtual_flow::run(flow, gateway, cost_item_ids));
        handle
    }

    fn begin_iap(
        self: &Arc<Self>,
        runtime: &Handle,
        gateway: Arc<dyn FulfillmentGateway>,
        transaction: Arc<TransactionDefinition>,
    ) -> Deferred<TransactionResult> {
        let key = transaction.key().to_string();
        let (handle, completer) = deferred::pair();

        let (adapter, product_id) = {
            let mut in_flight = self.in_flight.lock();
            if let Some(pending) = &in_flight.iap {
                let error = if pending.transaction == key {
                    TransactionError::AlreadyProcessing(key)
                } else {
                    TransactionError::AnotherPurchaseInProgress {
                        requested: key,
                        in_flight: pending.transaction.clone(),
                    }
                };
                tracing::warn!("Rejected IAP: {}", error);
                return Deferred::rejected(error);
            }

            let adapter = self.purchasing_adapter();
            let product_id = transaction.product_id().map(str::to_string);
            match (adapter, product_id) {
                (Some(adapter), Some(product_id)) => {
                    in_flight.iap = Some(PendingIap {
                        transaction: key,
                        product_id: product_id.clone(),
                        outcome: IapOutcome::Pending,
                        handle: handle.clone(),
                    });
                    (adapter, product_id)
                }
                (None, _) => {
                    drop(in_flight);
                    return self.reject_at_start(transaction, TransactionError::NoPurchasingAdapter);
                }
                (Some(_), None) => {
                    drop(in_flight);
                    return self
                        .reject_at_start(transaction, TransactionError::MissingProductId(key));
                }
            }
        };

        let flow = Flow::start(self, transaction, completer, IAP_STEPS);
        runtime.spawn(iap_flow::run(flow, gateway, adapter, product_id));
        handle
    }

    /// Fails a flow that never claimed a slot: `Initiated` then `Failed`.
    fn reject_at_start(
        &self,
        transaction: Arc<TransactionDefinition>,
        error: TransactionError,
    ) -> Deferred<TransactionResult> {
        tracing::info!("Transaction {} initiated", transaction.key());
        self.publish(&TransactionEvent::Initiated {
            transaction: Arc::clone(&transaction),
        });
        tracing::warn!("Transaction {} failed: {}", transaction.key(), error);
        self.record_receipt(&transaction, Err(&error));
        self.publish(&TransactionEvent::Failed {
            transaction,
            error: error.clone(),
        });
        Deferred::rejected(error)
    }

    /// Called when the platform reports a successful purchase of
    /// `product_id`.
    ///
    /// - If that product is the pending IAP, marks it succeeded and returns
    ///   the pending flow's handle
    /// - If nothing is pending, the purchase arrived unsolicited (restore,
    ///   interrupted session, store-initiated); its transaction is looked up
    ///   by product id and redeemed without contacting the store again
    ///
    /// # Errors
    ///
    /// - `UnexpectedPurchase` if a different product is pending
    /// - `AlreadyProcessing` if the pending purchase of `product_id` was
    ///   declined and its flow has not finished yet
    /// - `TransactionNotFoundForProduct` if no catalog IAP sells `product_id`
    /// - `Uninitialized`, `NoPurchasingAdapter` or `NoRuntime` when the
    ///   recovery flow cannot start
    pub fn finalize_successful_iap(
        self: &Arc<Self>,
        product_id: &str,
    ) -> Result<Deferred<TransactionResult>, TransactionError> {
        if let Some(claimed) = self.claim_pending_purchase(product_id) {
            return claimed;
        }

        let transaction = self
            .catalog
            .find_iap_by_product_id(product_id)
            .ok_or_else(|| TransactionError::TransactionNotFoundForProduct(product_id.to_string()))?;
        let gateway = self.gateway().ok_or(TransactionError::Uninitialized)?;
        let adapter = self
            .purchasing_adapter()
            .ok_or(TransactionError::NoPurchasingAdapter)?;
        let runtime = Handle::try_current()
            .map_err(|_| TransactionError::NoRuntime(transaction.key().to_string()))?;

        let (handle, completer) = deferred::pair();
        {
            let mut in_flight = self.in_flight.lock();
            if in_flight.iap.is_some() {
                drop(in_flight);
                return self.claim_pending_purchase(product_id).unwrap_or_else(|| {
                    Err(TransactionError::AlreadyProcessing(transaction.key().to_string()))
                });
            }
            in_flight.iap = Some(PendingIap {
                transaction: transaction.key().to_string(),
                product_id: product_id.to_string(),
                outcome: IapOutcome::Succeeded,
                handle: handle.clone(),
            });
        }

        tracing::info!(
            "Redeeming unsolicited purchase of {} for {}",
            product_id,
            transaction.key()
        );
        let flow = Flow::start(self, transaction, completer, IAP_STEPS);
        flow.progress(1);
        runtime.spawn(iap_flow::redeem(
            flow,
            gateway,
            adapter,
            product_id.to_string(),
        ));
        Ok(handle)
    }

    /// Resolves a success callback against the pending IAP, if any.
    fn claim_pending_purchase(
        &self,
        product_id: &str,
    ) -> Option<Result<Deferred<TransactionResult>, TransactionError>> {
        let mut in_flight = self.in_flight.lock();
        let pending = in_flight.iap.as_mut()?;

        if pending.product_id != product_id {
            return Some(Err(TransactionError::UnexpectedPurchase {
                pending: pending.product_id.clone(),
                received: product_id.to_string(),
            }));
        }

        match pending.outcome {
            // The declined flow still holds the slot. This purchase is a new
            // one and must wait for the slot to clear.
            IapOutcome::Failed(_) => {
                return Some(Err(TransactionError::AlreadyProcessing(
                    pending.transaction.clone(),
                )));
            }
            IapOutcome::Pending => {
                tracing::debug!("Platform confirmed purchase of {}", product_id);
                pending.outcome = IapOutcome::Succeeded;
            }
            IapOutcome::Succeeded => {}
        }
        Some(Ok(pending.handle.clone()))
    }

    /// Called when the platform reports a failed or cancelled purchase.
    pub fn platform_purchase_failure(&self, product_id: &str, message: &str) {
        let mut in_flight = self.in_flight.lock();
        match in_flight.iap.as_mut() {
            Some(pending)
                if pending.product_id == product_id && pending.outcome == IapOutcome::Pending =>
            {
                tracing::debug!("Platform declined purchase of {}: {}", product_id, message);
                pending.outcome = IapOutcome::Failed(message.to_string());
            }
            _ => tracing::warn!(
                "Ignoring purchase failure for {} with no matching pending purchase: {}",
                product_id,
                message
            ),
        }
    }

    /// Registers the purchasing adapter, replacing (and uninitializing)
    /// any previous one, and starts its purchase queue.
    ///
    /// The returned handle settles when the adapter finishes initializing.
    /// On failure the adapter is unregistered again.
    pub fn set_purchasing_adapter(
        self: &Arc<Self>,
        adapter: Arc<dyn PurchasingAdapter>,
    ) -> Deferred<(), TransactionError> {
        let Ok(runtime) = Handle::try_current() else {
            return Deferred::rejected(TransactionError::NoRuntime(
                "purchasing adapter".to_string(),
            ));
        };

        let generation = self.adapter_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let previous = self.purchasing.write().replace(AdapterSlot {
            generation,
            adapter: Arc::clone(&adapter),
        });
        if let Some(previous) = previous {
            previous.adapter.uninitialize();
        }

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        runtime.spawn(queue::drain_purchases(Arc::downgrade(self), queue_rx));

        let (init, init_completer) = deferred::pair::<(), PurchasingError>();
        tracing::info!("Initializing purchasing adapter for {}", adapter.platform());
        adapter.initialize(
            PurchaseSink::new(queue_tx, Arc::downgrade(self)),
            init_completer,
        );

        let (handle, reporter) = deferred::pair();
        let engine = Arc::downgrade(self);
        runtime.spawn(async move {
            let outcome = init.wait().await;
            let Some(engine) = engine.upgrade() else {
                return;
            };
            match outcome {
                Ok(()) => {
                    tracing::info!("Purchasing adapter initialized");
                    engine.publish(&TransactionEvent::PurchasingAdapterInitializeSucceeded);
                    reporter.resolve(());
                }
                Err(e) => {
                    let error = TransactionError::AdapterInitialization(e.to_string());
                    tracing::error!("{}", error);
                    engine.drop_adapter_generation(generation);
                    engine.publish(&TransactionEvent::PurchasingAdapterInitializeFailed {
                        error: error.clone(),
                    });
                    reporter.reject(error);
                }
            }
        });

        handle
    }

    /// Unregisters and uninitializes the purchasing adapter.
    pub fn remove_purchasing_adapter(&self) {
        let previous = self.purchasing.write().take();
        if let Some(previous) = previous {
            previous.adapter.uninitialize();
            tracing::info!("Purchasing adapter removed");
        }
    }

    fn drop_adapter_generation(&self, generation: u64) {
        let mut purchasing = self.purchasing.write();
        if purchasing
            .as_ref()
            .is_some_and(|slot| slot.generation == generation)
        {
            *purchasing = None;
        }
    }

    /// Asks the store to replay past purchases. Replayed purchases arrive
    /// through the purchase queue.
    ///
    /// # Errors
    ///
    /// Returns `NoPurchasingAdapter` if no adapter is registered.
    pub fn restore_purchases(&self) -> Result<(), TransactionError> {
        let adapter = self
            .purchasing_adapter()
            .ok_or(TransactionError::NoPurchasingAdapter)?;
        tracing::info!("Restoring purchases");
        adapter.restore_purchases();
        Ok(())
    }

    /// Store-localized name and price of `product_id`.
    ///
    /// # Errors
    ///
    /// Returns `NoPurchasingAdapter` if no adapter is registered.
    pub fn localized_product_info(
        &self,
        product_id: &str,
    ) -> Result<Option<LocalizedProductInfo>, TransactionError> {
        let adapter = self
            .purchasing_adapter()
            .ok_or(TransactionError::NoPurchasingAdapter)?;
        Ok(adapter.localized_product_info(product_id))
    }

    /// Returns true if `key` is the in-flight virtual transaction or the
    /// pending IAP.
    #[must_use]
    pub fn is_processing(&self, key: &str) -> bool {
        let in_flight = self.in_flight.lock();
        in_flight.virtual_txn.as_deref() == Some(key)
            || in_flight.iap.as_ref().is_some_and(|p| p.transaction == key)
    }

    /// Key of the in-flight virtual transaction.
    #[must_use]
    pub fn virtual_in_flight(&self) -> Option<String> {
        self.in_flight.lock().virtual_txn.clone()
    }

    /// The pending IAP.
    #[must_use]
    pub fn pending_iap(&self) -> Option<PendingIapInfo> {
        self.in_flight.lock().iap.as_ref().map(PendingIap::info)
    }

    /// Recent receipts, oldest first.
    #[must_use]
    pub fn recent_receipts(&self) -> Vec<TransactionReceipt> {
        self.receipts.lock().to_vec()
    }

    // ------------------------------------------------------------------
    // Internals shared by the flows
    // ------------------------------------------------------------------

    fn gateway(&self) -> Option<Arc<dyn FulfillmentGateway>> {
        self.gateway.read().clone()
    }

    fn purchasing_adapter(&self) -> Option<Arc<dyn PurchasingAdapter>> {
        self.purchasing
            .read()
            .as_ref()
            .map(|slot| Arc::clone(&slot.adapter))
    }

    pub(crate) fn publish(&self, event: &TransactionEvent) {
        self.listeners.publish(event);
    }

    /// Waits one poll interval.
    pub(crate) async fn tick(&self) {
        let interval = self.config.poll_interval();
        if interval.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(interval).await;
        }
    }

    /// Waits for the platform outcome of the IAP `key`.
    pub(crate) async fn await_platform_outcome(&self, key: &str) -> Result<(), TransactionError> {
        loop {
            let outcome = self
                .in_flight
                .lock()
                .iap
                .as_ref()
                .filter(|p| p.transaction == key)
                .map(|p| p.outcome.clone());
            match outcome {
                Some(IapOutcome::Pending) => self.tick().await,
                Some(IapOutcome::Succeeded) => return Ok(()),
                Some(IapOutcome::Failed(message)) => {
                    return Err(TransactionError::Platform(message))
                }
                None => return Err(TransactionError::Abandoned),
            }
        }
    }

    pub(crate) fn clear_slot(&self, kind: TransactionKind, key: &str) {
        let mut in_flight = self.in_flight.lock();
        match kind {
            TransactionKind::Virtual => {
                if in_flight.virtual_txn.as_deref() == Some(key) {
                    in_flight.virtual_txn = None;
                }
            }
            TransactionKind::Iap => {
                if in_flight.iap.as_ref().is_some_and(|p| p.transaction == key) {
                    in_flight.iap = None;
                }
            }
        }
    }

    /// Collects every unmet cost of `costs`.
    pub(crate) fn verify_costs(&self, costs: &ExchangeDefinition) -> Vec<Shortfall> {
        let mut shortfalls = Vec::new();

        for cost in &costs.currencies {
            let available = self.wallet.balance(&cost.currency).unwrap_or_else(|e| {
                tracing::warn!("Cannot read balance of {}: {}", cost.currency, e);
                0
            });
            if available < cost.amount {
                shortfalls.push(Shortfall::Currency {
                    currency: cost.currency.clone(),
                    required: cost.amount,
                    available,
                });
            }
        }

        for cost in &costs.items {
            let available = self.inventory.count_by_definition(&cost.item);
            if available < cost.amount {
                shortfalls.push(Shortfall::Item {
                    item: cost.item.clone(),
                    required: cost.amount,
                    available,
                });
            }
        }

        shortfalls
    }

    /// Picks instances to pay the item costs with, oldest first. An
    /// instance is never picked twice.
    pub(crate) fn select_cost_items(
        &self,
        costs: &ExchangeDefinition,
    ) -> Result<Vec<String>, TransactionError> {
        let mut selected: Vec<String> = Vec::new();

        for cost in &costs.items {
            let candidates: Vec<String> = self
                .inventory
                .find_items_by_definition(&cost.item)
                .into_iter()
                .map(|item| item.id)
                .filter(|id| !selected.contains(id))
                .collect();

            let required = usize::try_from(cost.amount).unwrap_or(usize::MAX);
            if candidates.len() < required {
                return Err(TransactionError::NotEnoughItems {
                    item: cost.item.clone(),
                    required: cost.amount,
                    available: candidates.len() as u64,
                });
            }
            selected.extend(candidates.into_iter().take(required));
        }

        Ok(selected)
    }

    /// Debits confirmed costs: currencies, then items.
    pub(crate) fn apply_costs(&self, cost: &ConfirmedExchange) {
        for currency in &cost.currencies {
            if let Err(e) = self
                .wallet
                .remove_balance_internal(&currency.currency, currency.amount)
            {
                tracing::error!(
                    "Failed to debit {} {}: {}",
                    currency.amount,
                    currency.currency,
                    e
                );
            }
        }
        for item in &cost.items {
            if let Err(e) = self.inventory.remove_item_internal(&item.instance_id) {
                tracing::error!("Failed to remove item {}: {}", item.instance_id, e);
            }
        }
    }

    /// Credits confirmed rewards: currencies, then items under the ids the
    /// gateway assigned.
    pub(crate) fn apply_rewards(&self, reward: &ConfirmedExchange) {
        for currency in &reward.currencies {
            if let Err(e) = self
                .wallet
                .add_balance_internal(&currency.currency, currency.amount)
            {
                tracing::error!(
                    "Failed to credit {} {}: {}",
                    currency.amount,
                    currency.currency,
                    e
                );
            }
        }
        for item in &reward.items {
            if let Err(e) = self
                .inventory
                .create_item_internal(&item.definition, Some(&item.instance_id))
            {
                tracing::error!(
                    "Failed to create {} item {}: {}",
                    item.definition,
                    item.instance_id,
                    e
                );
            }
        }
    }

    pub(crate) fn record_receipt(
        &self,
        transaction: &TransactionDefinition,
        outcome: Result<&TransactionResult, &TransactionError>,
    ) {
        let sequence = self.receipt_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let (success, failure_reason, price, payout) = match outcome {
            Ok(result) => (
                true,
                None,
                Price::from(&result.costs),
                Payout::from(&result.rewards),
            ),
            Err(error) => (
                false,
                Some(error.to_string()),
                Price::from(transaction.costs()),
                Payout::from(transaction.rewards()),
            ),
        };

        let receipt = TransactionReceipt {
            id: format!("{}-{sequence}", transaction.key()),
            transaction: transaction.key().to_string(),
            timestamp_ms: TransactionReceipt::now_ms(),
            success,
            failure_reason,
            price,
            payout,
        };
        tracing::info!("Receipt {}", receipt);
        self.receipts.lock().push(receipt);
    }
}
