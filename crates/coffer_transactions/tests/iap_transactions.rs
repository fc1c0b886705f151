//! Integration tests for in-app purchase flows.

mod common;

use parking_lot::Mutex;
use std::sync::Arc;

use common::{event_names, exchange, exchange_data, settle, until, GatewayCall, Harness};

use coffer_transactions::{
    Completer, ConfirmedExchange, FakeStoreAdapter, FakeStoreMode, GatewayError, IapOutcome,
    LocalizedProductInfo, PurchaseData, PurchaseSink, PurchasingAdapter, PurchasingError,
    StorePlatform, TransactionError, TransactionEvent, IAP_STEPS,
};

async fn attach_store(h: &Harness, mode: FakeStoreMode) -> Arc<FakeStoreAdapter> {
    let store = Arc::new(FakeStoreAdapter::new(mode));
    let ready = h
        .engine
        .set_purchasing_adapter(Arc::clone(&store) as Arc<dyn PurchasingAdapter>);
    settle(&ready).await.unwrap();
    store
}

fn gems(amount: u64) -> coffer_transactions::TransactionExchangeData {
    exchange_data(ConfirmedExchange::default(), exchange(&[("gems", amount)], &[]))
}

/// Adapter for platforms the fake store does not cover. It always holds a
/// purchase of whatever product is asked about.
struct StubStore {
    platform: StorePlatform,
    receipt_parts: Vec<String>,
    completed: Mutex<Vec<String>>,
}

impl StubStore {
    fn new(platform: StorePlatform, receipt_parts: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            platform,
            receipt_parts: receipt_parts.iter().map(ToString::to_string).collect(),
            completed: Mutex::new(Vec::new()),
        })
    }
}

impl PurchasingAdapter for StubStore {
    fn platform(&self) -> StorePlatform {
        self.platform.clone()
    }

    fn initialize(&self, _sink: PurchaseSink, completer: Completer<(), PurchasingError>) {
        completer.resolve(());
    }

    fn uninitialize(&self) {}

    fn begin_purchase(&self, _product_id: &str, _payload: Option<&str>) {}

    fn current_purchase_data(&self, product_id: &str) -> Option<PurchaseData> {
        Some(PurchaseData {
            product_id: product_id.to_string(),
            receipt_parts: self.receipt_parts.clone(),
        })
    }

    fn complete_pending_purchase(&self, product_id: &str) {
        self.completed.lock().push(product_id.to_string());
    }

    fn restore_purchases(&self) {}

    fn localized_product_info(&self, _product_id: &str) -> Option<LocalizedProductInfo> {
        None
    }
}

async fn attach_stub(h: &Harness, stub: &Arc<StubStore>) {
    let ready = h
        .engine
        .set_purchasing_adapter(Arc::clone(stub) as Arc<dyn PurchasingAdapter>);
    settle(&ready).await.unwrap();
}

#[tokio::test]
async fn test_player_started_purchase() {
    let (h, gateway) = Harness::scripted();
    let store = attach_store(&h, FakeStoreMode::Manual).await;
    let events = h.engine.subscribe();

    let handle = h.engine.begin_transaction_by_key("gem_pack", Vec::new());
    until(|| store.requested_purchase().is_some()).await;

    assert_eq!(handle.total_steps(), IAP_STEPS);
    assert_eq!(handle.current_step(), 1);
    assert_eq!(h.engine.pending_iap().unwrap().outcome, IapOutcome::Pending);
    assert_eq!(gateway.call_count(), 0);

    assert!(store.approve_pending());
    let (call, completer) = gateway.next_request().await;
    assert_eq!(
        call,
        GatewayCall::FakeStore {
            transaction: "gem_pack".to_string(),
            receipt: "fake-receipt:gems_100:1".to_string(),
        }
    );
    completer.resolve(gems(100));

    let result = settle(&handle).await.unwrap();
    assert!(result.costs.is_empty());
    assert_eq!(result.rewards.currency_total("gems"), 100);
    assert_eq!(h.gems(), 100);
    assert_eq!(store.finalized(), vec!["gems_100"]);
    assert_eq!(store.unfinalized_count(), 0);
    assert_eq!(handle.current_step(), 4);
    assert_eq!(h.engine.pending_iap(), None);
    assert_eq!(
        event_names(&events),
        vec![
            "initiated",
            "progress 1/4",
            "progress 2/4",
            "progress 3/4",
            "progress 4/4",
            "succeeded"
        ]
    );
}

#[tokio::test]
async fn test_declined_purchase() {
    let (h, gateway) = Harness::scripted();
    let store = attach_store(&h, FakeStoreMode::Manual).await;
    let events = h.engine.subscribe();

    let handle = h.engine.begin_transaction_by_key("gem_pack", Vec::new());
    until(|| store.requested_purchase().is_some()).await;
    assert!(store.decline_pending("user cancelled"));

    let error = settle(&handle).await.unwrap_err();
    assert_eq!(error, TransactionError::Platform("user cancelled".to_string()));
    assert_eq!(error.to_string(), "user cancelled");
    assert_eq!(gateway.call_count(), 0);
    assert_eq!(h.engine.pending_iap(), None);
    assert_eq!(
        event_names(&events),
        vec!["initiated", "progress 1/4", "failed"]
    );

    // The same transaction can be bought again right away.
    let retry = h.engine.begin_transaction_by_key("gem_pack", Vec::new());
    until(|| store.requested_purchase().is_some()).await;
    assert_eq!(store.requested_purchase().as_deref(), Some("gems_100"));
    assert!(!retry.is_done());
    assert_eq!(retry.error(), None);
    assert_eq!(h.engine.pending_iap().unwrap().outcome, IapOutcome::Pending);
}

#[tokio::test]
async fn test_auto_declined_purchase() {
    let (h, _gateway) = Harness::scripted();
    let _store = attach_store(&h, FakeStoreMode::AutoDecline("card declined".to_string())).await;

    let handle = h.engine.begin_transaction_by_key("gem_pack", Vec::new());
    assert_eq!(
        settle(&handle).await,
        Err(TransactionError::Platform("card declined".to_string()))
    );
}

#[tokio::test]
async fn test_unsolicited_purchase_is_redeemed() {
    let (h, gateway) = Harness::scripted();
    let store = attach_store(&h, FakeStoreMode::Manual).await;
    let events = h.engine.subscribe();

    assert!(store.inject_unsolicited("gems_100"));

    let (call, completer) = gateway.next_request().await;
    assert!(matches!(call, GatewayCall::FakeStore { ref transaction, .. } if transaction == "gem_pack"));
    assert_eq!(h.engine.pending_iap().unwrap().outcome, IapOutcome::Succeeded);
    completer.resolve(gems(100));

    until(|| h.engine.pending_iap().is_none()).await;
    assert_eq!(h.gems(), 100);
    assert_eq!(store.finalized(), vec!["gems_100"]);

    let names = event_names(&events);
    assert_eq!(names.first().map(String::as_str), Some("initiated"));
    assert_eq!(names.last().map(String::as_str), Some("succeeded"));

    let receipts = h.engine.recent_receipts();
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].transaction, "gem_pack");
    assert!(receipts[0].success);
}

#[tokio::test]
async fn test_repeated_success_callback_applies_once() {
    let (h, gateway) = Harness::scripted();
    let store = attach_store(&h, FakeStoreMode::Manual).await;

    let handle = h.engine.begin_transaction_by_key("gem_pack", Vec::new());
    until(|| store.requested_purchase().is_some()).await;
    store.approve_pending();

    let again = h.engine.finalize_successful_iap("gems_100").unwrap();
    assert!(again.same_operation(&handle));

    let (_, completer) = gateway.next_request().await;
    completer.resolve(gems(100));
    settle(&handle).await.unwrap();
    until(|| h.engine.pending_iap().is_none()).await;

    // A late duplicate finds the purchase already consumed.
    let late = h.engine.finalize_successful_iap("gems_100").unwrap();
    assert_eq!(
        settle(&late).await,
        Err(TransactionError::MissingPurchaseData("gems_100".to_string()))
    );

    assert_eq!(h.gems(), 100);
    assert_eq!(gateway.call_count(), 1);
}

#[tokio::test]
async fn test_success_for_another_product_is_unexpected() {
    let (h, _gateway) = Harness::scripted();
    let store = attach_store(&h, FakeStoreMode::Manual).await;

    let _handle = h.engine.begin_transaction_by_key("gem_pack", Vec::new());
    until(|| store.requested_purchase().is_some()).await;

    assert_eq!(
        h.engine.finalize_successful_iap("starter").unwrap_err(),
        TransactionError::UnexpectedPurchase {
            pending: "gems_100".to_string(),
            received: "starter".to_string(),
        }
    );
    assert_eq!(h.engine.pending_iap().unwrap().outcome, IapOutcome::Pending);
}

#[tokio::test]
async fn test_unknown_product() {
    let (h, _gateway) = Harness::scripted();
    let _store = attach_store(&h, FakeStoreMode::Manual).await;

    assert_eq!(
        h.engine.finalize_successful_iap("castle").unwrap_err(),
        TransactionError::TransactionNotFoundForProduct("castle".to_string())
    );
}

#[tokio::test]
async fn test_one_iap_at_a_time_alongside_virtual() {
    let (h, gateway) = Harness::scripted();
    let store = attach_store(&h, FakeStoreMode::Manual).await;

    let _handle = h.engine.begin_transaction_by_key("gem_pack", Vec::new());
    let again = h.engine.begin_transaction_by_key("gem_pack", Vec::new());
    let other = h.engine.begin_transaction_by_key("starter_bundle", Vec::new());
    let virtual_txn = h.engine.begin_transaction_by_key("buy_key", Vec::new());

    assert_eq!(
        again.error(),
        Some(TransactionError::AlreadyProcessing("gem_pack".to_string()))
    );
    assert_eq!(
        other.error(),
        Some(TransactionError::AnotherPurchaseInProgress {
            requested: "starter_bundle".to_string(),
            in_flight: "gem_pack".to_string(),
        })
    );

    // The virtual slot is independent of the IAP slot.
    let (call, completer) = gateway.next_request().await;
    assert!(matches!(call, GatewayCall::Virtual { .. }));
    completer.resolve(exchange_data(
        exchange(&[("gold", 10)], &[]),
        exchange(&[], &[("key", "key-1")]),
    ));
    settle(&virtual_txn).await.unwrap();
    assert!(store.requested_purchase().is_some());
}

#[tokio::test]
async fn test_no_adapter_fails_after_initiating() {
    let (h, _gateway) = Harness::scripted();
    let events = h.engine.subscribe();

    let handle = h.engine.begin_transaction_by_key("gem_pack", Vec::new());

    assert_eq!(handle.error(), Some(TransactionError::NoPurchasingAdapter));
    assert_eq!(event_names(&events), vec!["initiated", "failed"]);
    assert_eq!(h.engine.pending_iap(), None);
}

#[tokio::test]
async fn test_missing_product_id() {
    let (h, _gateway) = Harness::scripted();
    let _store = attach_store(&h, FakeStoreMode::AutoApprove).await;

    let handle = h.engine.begin_transaction_by_key("broken_pack", Vec::new());
    assert_eq!(
        handle.error(),
        Some(TransactionError::MissingProductId("broken_pack".to_string()))
    );
}

#[tokio::test]
async fn test_failed_redemption_keeps_purchase_for_restore() {
    let (h, gateway) = Harness::scripted();
    let store = attach_store(&h, FakeStoreMode::AutoApprove).await;

    let handle = h.engine.begin_transaction_by_key("gem_pack", Vec::new());
    let (_, completer) = gateway.next_request().await;
    completer.reject(GatewayError::Network("timeout".to_string()));

    assert_eq!(
        settle(&handle).await,
        Err(TransactionError::Gateway(GatewayError::Network(
            "timeout".to_string()
        )))
    );
    assert_eq!(h.gems(), 0);
    assert_eq!(store.unfinalized_count(), 1);

    h.engine.restore_purchases().unwrap();
    let (_, completer) = gateway.next_request().await;
    completer.resolve(gems(100));

    until(|| store.unfinalized_count() == 0).await;
    assert_eq!(h.gems(), 100);
}

#[tokio::test]
async fn test_adapter_initialization_failure() {
    let (h, _gateway) = Harness::scripted();
    let events = h.engine.subscribe();
    let store = Arc::new(FakeStoreAdapter::new(FakeStoreMode::Manual).with_init_failure("offline"));

    let ready = h
        .engine
        .set_purchasing_adapter(Arc::clone(&store) as Arc<dyn PurchasingAdapter>);
    assert_eq!(
        settle(&ready).await,
        Err(TransactionError::AdapterInitialization(
            "store unavailable: offline".to_string()
        ))
    );
    assert!(matches!(
        events.try_recv(),
        Ok(TransactionEvent::PurchasingAdapterInitializeFailed { .. })
    ));

    let handle = h.engine.begin_transaction_by_key("gem_pack", Vec::new());
    assert_eq!(handle.error(), Some(TransactionError::NoPurchasingAdapter));
}

#[tokio::test]
async fn test_adapter_initialization_event() {
    let (h, _gateway) = Harness::scripted();
    let events = h.engine.subscribe();
    let _store = attach_store(&h, FakeStoreMode::Manual).await;

    until(|| !events.is_empty()).await;
    assert_eq!(event_names(&events), vec!["adapter ready"]);
}

#[tokio::test]
async fn test_localized_product_info() {
    let (h, _gateway) = Harness::scripted();
    assert_eq!(
        h.engine.localized_product_info("gems_100"),
        Err(TransactionError::NoPurchasingAdapter)
    );

    let store = Arc::new(
        FakeStoreAdapter::new(FakeStoreMode::Manual).with_product("gems_100", "Gems", "$0.99"),
    );
    let ready = h
        .engine
        .set_purchasing_adapter(Arc::clone(&store) as Arc<dyn PurchasingAdapter>);
    settle(&ready).await.unwrap();

    let info = h.engine.localized_product_info("gems_100").unwrap().unwrap();
    assert_eq!(info.name, "Gems");
    assert_eq!(info.price, "$0.99");
}

#[tokio::test]
async fn test_google_receipts_carry_signature() {
    let (h, gateway) = Harness::scripted();
    let stub = StubStore::new(StorePlatform::GooglePlay, &["purchase-json", "sig"]);
    attach_stub(&h, &stub).await;

    let handle = h.engine.finalize_successful_iap("gems_100").unwrap();
    let (call, completer) = gateway.next_request().await;
    assert_eq!(
        call,
        GatewayCall::Google {
            transaction: "gem_pack".to_string(),
            purchase_data: "purchase-json".to_string(),
            signature: "sig".to_string(),
        }
    );
    completer.resolve(gems(100));

    settle(&handle).await.unwrap();
    assert_eq!(*stub.completed.lock(), vec!["gems_100"]);
}

#[tokio::test]
async fn test_apple_receipt() {
    let (h, gateway) = Harness::scripted();
    let stub = StubStore::new(StorePlatform::AppleAppStore, &["apple-receipt"]);
    attach_stub(&h, &stub).await;

    let _handle = h.engine.finalize_successful_iap("gems_100").unwrap();
    let (call, _completer) = gateway.next_request().await;
    assert_eq!(
        call,
        GatewayCall::Apple {
            transaction: "gem_pack".to_string(),
            receipt: "apple-receipt".to_string(),
        }
    );
}

#[tokio::test]
async fn test_malformed_receipt() {
    let (h, gateway) = Harness::scripted();
    let stub = StubStore::new(StorePlatform::GooglePlay, &["purchase-json"]);
    attach_stub(&h, &stub).await;

    let handle = h.engine.finalize_successful_iap("gems_100").unwrap();
    assert_eq!(
        settle(&handle).await,
        Err(TransactionError::MalformedReceipt {
            product_id: "gems_100".to_string(),
            expected: 2,
            actual: 1,
        })
    );
    assert_eq!(gateway.call_count(), 0);
    assert!(stub.completed.lock().is_empty());
}

#[tokio::test]
async fn test_unsupported_platform() {
    let (h, gateway) = Harness::scripted();
    let stub = StubStore::new(StorePlatform::Other("steam".to_string()), &["ticket"]);
    attach_stub(&h, &stub).await;

    let handle = h.engine.finalize_successful_iap("gems_100").unwrap();
    assert_eq!(
        settle(&handle).await,
        Err(TransactionError::UnsupportedPlatform(StorePlatform::Other(
            "steam".to_string()
        )))
    );
    assert_eq!(gateway.call_count(), 0);
    assert_eq!(h.engine.pending_iap(), None);
}
