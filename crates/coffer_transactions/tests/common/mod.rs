//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use coffer_economy::{
    Catalog, CurrencyDefinition, ExchangeDefinition, IapTransaction, Inventory,
    InventoryItemDefinition, InventoryService, VirtualTransaction, Wallet, WalletService,
};
use coffer_transactions::{
    Abandoned, ConfirmedExchange, CurrencyAmount, Deferred, EngineConfig, FulfillmentGateway,
    GatewayCompleter, ItemInstanceRef, LocalFulfillmentGateway, TransactionEngine,
    TransactionEvent, TransactionExchangeData,
};

/// A request the engine sent to the gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayCall {
    Virtual {
        transaction: String,
        cost_item_ids: Vec<String>,
    },
    Apple {
        transaction: String,
        receipt: String,
    },
    Google {
        transaction: String,
        purchase_data: String,
        signature: String,
    },
    FakeStore {
        transaction: String,
        receipt: String,
    },
}

/// Gateway that holds every request until the test answers it.
#[derive(Default)]
pub struct ScriptedGateway {
    calls: Mutex<Vec<GatewayCall>>,
    waiting: Mutex<VecDeque<(GatewayCall, GatewayCompleter)>>,
}

impl ScriptedGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().clone()
    }

    /// Waits for the next unanswered request.
    pub async fn next_request(&self) -> (GatewayCall, GatewayCompleter) {
        for _ in 0..10_000 {
            if let Some(request) = self.waiting.lock().pop_front() {
                return request;
            }
            tokio::task::yield_now().await;
        }
        panic!("gateway never received a request");
    }

    fn record(&self, call: GatewayCall, completer: GatewayCompleter) {
        self.calls.lock().push(call.clone());
        self.waiting.lock().push_back((call, completer));
    }
}

impl FulfillmentGateway for ScriptedGateway {
    fn make_virtual_transaction(
        &self,
        transaction_id: &str,
        cost_item_ids: &[String],
        completer: GatewayCompleter,
    ) {
        self.record(
            GatewayCall::Virtual {
                transaction: transaction_id.to_string(),
                cost_item_ids: cost_item_ids.to_vec(),
            },
            completer,
        );
    }

    fn redeem_apple_iap(&self, transaction_id: &str, receipt: &str, completer: GatewayCompleter) {
        self.record(
            GatewayCall::Apple {
                transaction: transaction_id.to_string(),
                receipt: receipt.to_string(),
            },
            completer,
        );
    }

    fn redeem_google_iap(
        &self,
        transaction_id: &str,
        purchase_data: &str,
        signature: &str,
        completer: GatewayCompleter,
    ) {
        self.record(
            GatewayCall::Google {
                transaction: transaction_id.to_string(),
                purchase_data: purchase_data.to_string(),
                signature: signature.to_string(),
            },
            completer,
        );
    }

    fn redeem_fake_store_iap(
        &self,
        transaction_id: &str,
        receipt: &str,
        completer: GatewayCompleter,
    ) {
        self.record(
            GatewayCall::FakeStore {
                transaction: transaction_id.to_string(),
                receipt: receipt.to_string(),
            },
            completer,
        );
    }
}

/// gold (100), gems, key, sword, shield.
///
/// - `buy_sword`: 50 gold + 1 key -> 1 sword
/// - `buy_key`: 10 gold -> 1 key
/// - `gem_pack` (IAP `gems_100`): 100 gems
/// - `starter_bundle` (IAP `starter`): 500 gold + 1 shield
/// - `broken_pack` (IAP, no product id)
pub fn catalog() -> Arc<Catalog> {
    Arc::new(
        Catalog::builder()
            .add_currency(CurrencyDefinition::new("gold", "Gold").with_initial_balance(100))
            .add_currency(CurrencyDefinition::new("gems", "Gems"))
            .add_item(InventoryItemDefinition::new("key", "Key"))
            .add_item(InventoryItemDefinition::new("sword", "Sword"))
            .add_item(InventoryItemDefinition::new("shield", "Shield"))
            .add_virtual_transaction(VirtualTransaction::new(
                "buy_sword",
                "Buy Sword",
                ExchangeDefinition::new()
                    .with_currency("gold", 50)
                    .with_item("key", 1),
                ExchangeDefinition::new().with_item("sword", 1),
            ))
            .add_virtual_transaction(VirtualTransaction::new(
                "buy_key",
                "Buy Key",
                ExchangeDefinition::new().with_currency("gold", 10),
                ExchangeDefinition::new().with_item("key", 1),
            ))
            .add_iap_transaction(IapTransaction::new(
                "gem_pack",
                "Gem Pack",
                Some("gems_100".to_string()),
                ExchangeDefinition::new().with_currency("gems", 100),
            ))
            .add_iap_transaction(IapTransaction::new(
                "starter_bundle",
                "Starter Bundle",
                Some("starter".to_string()),
                ExchangeDefinition::new()
                    .with_currency("gold", 500)
                    .with_item("shield", 1),
            ))
            .add_iap_transaction(IapTransaction::new(
                "broken_pack",
                "Broken Pack",
                None,
                ExchangeDefinition::new().with_currency("gems", 1),
            ))
            .build()
            .unwrap(),
    )
}

pub struct Harness {
    pub catalog: Arc<Catalog>,
    pub wallet: Arc<Wallet>,
    pub inventory: Arc<Inventory>,
    pub engine: Arc<TransactionEngine>,
}

impl Harness {
    /// Engine over fresh state, not yet initialized.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::immediate())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let catalog = catalog();
        let wallet = Arc::new(Wallet::from_catalog(&catalog));
        let inventory = Arc::new(Inventory::from_catalog(&catalog));
        let engine = TransactionEngine::new(
            config,
            Arc::clone(&catalog),
            Arc::clone(&wallet) as Arc<dyn WalletService>,
            Arc::clone(&inventory) as Arc<dyn InventoryService>,
        );
        Self {
            catalog,
            wallet,
            inventory,
            engine,
        }
    }

    /// Engine initialized with a scripted gateway.
    pub fn scripted() -> (Self, Arc<ScriptedGateway>) {
        let harness = Self::new();
        let gateway = ScriptedGateway::new();
        harness
            .engine
            .initialize(Arc::clone(&gateway) as Arc<dyn FulfillmentGateway>);
        (harness, gateway)
    }

    /// Engine initialized with the local gateway.
    pub fn local() -> Self {
        Self::local_with_config(EngineConfig::immediate())
    }

    pub fn local_with_config(config: EngineConfig) -> Self {
        let harness = Self::with_config(config);
        harness.engine.initialize(Arc::new(LocalFulfillmentGateway::new(
            Arc::clone(&harness.catalog),
            Arc::clone(&harness.wallet) as Arc<dyn WalletService>,
            Arc::clone(&harness.inventory) as Arc<dyn InventoryService>,
        )));
        harness
    }

    pub fn gold(&self) -> u64 {
        self.wallet.balance("gold").unwrap()
    }

    pub fn gems(&self) -> u64 {
        self.wallet.balance("gems").unwrap()
    }

    pub fn give_item(&self, definition: &str) -> String {
        self.inventory
            .create_item_internal(definition, None)
            .unwrap()
            .id
    }
}

/// Waits for a handle to settle, failing the test after five seconds.
pub async fn settle<T, E>(handle: &Deferred<T, E>) -> Result<T, E>
where
    T: Clone,
    E: Clone + From<Abandoned>,
{
    tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("handle did not settle")
}

/// Yields until `condition` holds, failing the test if it never does.
pub async fn until(mut condition: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}

pub fn exchange(currencies: &[(&str, u64)], items: &[(&str, &str)]) -> ConfirmedExchange {
    ConfirmedExchange {
        currencies: currencies
            .iter()
            .map(|(currency, amount)| CurrencyAmount::new(*currency, *amount))
            .collect(),
        items: items
            .iter()
            .map(|(definition, id)| ItemInstanceRef::new(*definition, *id))
            .collect(),
    }
}

pub fn exchange_data(cost: ConfirmedExchange, reward: ConfirmedExchange) -> TransactionExchangeData {
    TransactionExchangeData { cost, reward }
}

/// Event names for compact ordering assertions.
pub fn event_names(events: &crossbeam_channel::Receiver<TransactionEvent>) -> Vec<String> {
    events
        .try_iter()
        .map(|event| match event {
            TransactionEvent::Initiated { .. } => "initiated".to_string(),
            TransactionEvent::Progressed { step, total, .. } => format!("progress {step}/{total}"),
            TransactionEvent::Succeeded { .. } => "succeeded".to_string(),
            TransactionEvent::Failed { .. } => "failed".to_string(),
            TransactionEvent::PurchasingAdapterInitializeSucceeded => "adapter ready".to_string(),
            TransactionEvent::PurchasingAdapterInitializeFailed { .. } => {
                "adapter failed".to_string()
            }
        })
        .collect()
}

/// Like [`until`], for engines that poll on a real interval.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never became true");
}
