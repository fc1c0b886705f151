//! In-app purchase flow.
//!
//! [`run`] drives a purchase the player started. [`redeem`] is the tail it
//! shares with unsolicited purchases: fetch the receipt, have the gateway
//! redeem it, apply rewards, consume the purchase on the store.

use std::sync::Arc;

use super::flow::Flow;
use crate::deferred;
use crate::error::TransactionError;
use crate::gateway::FulfillmentGateway;
use crate::purchasing::{PurchasingAdapter, StorePlatform};
use crate::result::{ConfirmedExchange, TransactionExchangeData, TransactionResult};

pub(super) async fn run(
    flow: Flow,
    gateway: Arc<dyn FulfillmentGateway>,
    adapter: Arc<dyn PurchasingAdapter>,
    product_id: String,
) {
    let payload = flow.engine.config().purchase_payload.clone();
    tracing::debug!("Starting platform purchase of {}", product_id);
    adapter.begin_purchase(&product_id, payload.as_deref());
    flow.progress(1);

    let engine = Arc::clone(&flow.engine);
    let outcome = engine.await_platform_outcome(flow.key()).await;
    if let Err(e) = outcome {
        return flow.fail(e);
    }

    redeem(flow, gateway, adapter, product_id).await;
}

pub(super) async fn redeem(
    flow: Flow,
    gateway: Arc<dyn FulfillmentGateway>,
    adapter: Arc<dyn PurchasingAdapter>,
    product_id: String,
) {
    flow.progress(2);

    let Some(purchase) = adapter.current_purchase_data(&product_id) else {
        return flow.fail(TransactionError::MissingPurchaseData(product_id));
    };
    if purchase.product_id != product_id {
        return flow.fail(TransactionError::UnexpectedPurchase {
            pending: product_id,
            received: purchase.product_id,
        });
    }

    let platform = adapter.platform();
    let Some(expected) = platform.receipt_arity() else {
        return flow.fail(TransactionError::UnsupportedPlatform(platform));
    };
    let parts = &purchase.receipt_parts;
    if parts.len() < expected {
        return flow.fail(TransactionError::MalformedReceipt {
            product_id,
            expected,
            actual: parts.len(),
        });
    }

    let (pending, completer) = deferred::pair::<TransactionExchangeData, _>();
    let key = flow.key().to_string();
    match &platform {
        StorePlatform::AppleAppStore => gateway.redeem_apple_iap(&key, &parts[0], completer),
        StorePlatform::GooglePlay => {
            gateway.redeem_google_iap(&key, &parts[0], &parts[1], completer);
        }
        StorePlatform::FakeStore => gateway.redeem_fake_store_iap(&key, &parts[0], completer),
        StorePlatform::Other(_) => {
            return flow.fail(TransactionError::UnsupportedPlatform(platform.clone()));
        }
    }

    let data = match pending.wait().await {
        Ok(data) => data,
        // The purchase stays unconsumed so a later restore can retry it.
        Err(e) => return flow.fail(TransactionError::Gateway(e)),
    };
    flow.progress(3);

    flow.engine.apply_rewards(&data.reward);
    adapter.complete_pending_purchase(&product_id);

    flow.succeed(TransactionResult {
        transaction: key,
        costs: ConfirmedExchange::default(),
        rewards: data.reward,
    });
}
