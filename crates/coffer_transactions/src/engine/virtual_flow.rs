//! Virtual transaction flow.

use std::sync::Arc;

use super::flow::Flow;
use crate::deferred;
use crate::error::TransactionError;
use crate::gateway::FulfillmentGateway;
use crate::result::{TransactionExchangeData, TransactionResult};

pub(super) async fn run(
    flow: Flow,
    gateway: Arc<dyn FulfillmentGateway>,
    cost_item_ids: Vec<String>,
) {
    let engine = Arc::clone(&flow.engine);
    let costs = flow.transaction.costs().clone();

    // Init -> CostVerified
    let shortfalls = engine.verify_costs(&costs);
    if !shortfalls.is_empty() {
        return flow.fail(TransactionError::InsufficientResources(shortfalls));
    }

    let cost_item_ids = if cost_item_ids.is_empty() && costs.has_items() {
        match engine.select_cost_items(&costs) {
            Ok(ids) => ids,
            Err(e) => return flow.fail(e),
        }
    } else {
        cost_item_ids
    };
    flow.progress(1);

    // CostVerified -> Fulfilled
    let (pending, completer) = deferred::pair::<TransactionExchangeData, _>();
    tracing::debug!(
        "Sending {} to gateway with {} cost items",
        flow.key(),
        cost_item_ids.len()
    );
    gateway.make_virtual_transaction(flow.key(), &cost_item_ids, completer);
    let data = match pending.wait().await {
        Ok(data) => data,
        Err(e) => return flow.fail(TransactionError::Gateway(e)),
    };
    flow.progress(2);

    // Fulfilled -> Done
    engine.apply_costs(&data.cost);
    engine.apply_rewards(&data.reward);

    let result = TransactionResult {
        transaction: flow.key().to_string(),
        costs: data.cost,
        rewards: data.reward,
    };
    flow.succeed(result);
}
