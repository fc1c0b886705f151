//! # Purchase Queue
//!
//! Serializes platform success callbacks. Purchases can arrive in bursts
//! (restores, several products bought while the game was closed); each one
//! is redeemed to completion before the next is looked at.
//!
//! ```text
//! PurchaseSink::purchase_succeeded ──> mpsc ──> drain_purchases
//!                                                  │ wait while another product is pending
//!                                                  │ finalize_successful_iap
//!                                                  └ wait for the redemption to settle
//! ```
//!
//! While the head is blocked by a pending IAP, a queued success for that
//! pending product moves ahead of it. Otherwise the pending flow would wait
//! on a callback stuck behind the head, and the head would wait on the flow.
//! A pending purchase the store already declined never takes a callback:
//! the queue waits for its flow to finish and redeems the purchase on its own.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::engine::{IapOutcome, TransactionEngine};

/// Runs until every sender is dropped or the engine goes away.
pub(crate) async fn drain_purchases(
    engine: Weak<TransactionEngine>,
    mut purchases: UnboundedReceiver<String>,
) {
    let mut backlog: VecDeque<String> = VecDeque::new();

    loop {
        let head = match backlog.pop_front() {
            Some(product_id) => product_id,
            None => match purchases.recv().await {
                Some(product_id) => product_id,
                None => break,
            },
        };
        let Some(engine) = engine.upgrade() else {
            break;
        };

        tracing::debug!("Dequeued purchase of {}", head);
        let product_id = next_redeemable(&engine, head, &mut backlog, &mut purchases).await;

        match engine.finalize_successful_iap(&product_id) {
            Ok(handle) => {
                if let Err(e) = handle.wait().await {
                    tracing::warn!("Purchase of {} was not redeemed: {}", product_id, e);
                }
            }
            Err(e) => tracing::warn!("Dropped queued purchase of {}: {}", product_id, e),
        }
    }

    tracing::debug!("Purchase queue closed");
}

/// Waits until `head` can be finalized, or returns a queued purchase of
/// the pending product first (pushing `head` back to the front).
async fn next_redeemable(
    engine: &Arc<TransactionEngine>,
    head: String,
    backlog: &mut VecDeque<String>,
    purchases: &mut UnboundedReceiver<String>,
) -> String {
    loop {
        let Some(pending) = engine.pending_iap() else {
            return head;
        };
        // A declined purchase blocks every product until its flow clears the
        // slot, its own product included.
        let declined = matches!(pending.outcome, IapOutcome::Failed(_));
        if pending.product_id == head && !declined {
            return head;
        }

        if !declined {
            while let Ok(product_id) = purchases.try_recv() {
                backlog.push_back(product_id);
            }
            if let Some(index) = backlog.iter().position(|p| *p == pending.product_id) {
                if let Some(matching) = backlog.remove(index) {
                    tracing::debug!("Purchase of pending {} overtakes {}", matching, head);
                    backlog.push_front(head);
                    return matching;
                }
            }
        }

        engine.tick().await;
    }
}
