//! In-flight slots: one virtual transaction, one IAP.
//!
//! Both slots live behind a single mutex in the engine. Checks and claims
//! happen inside one critical section, so two callers can never both see an
//! empty slot and both claim it.

use crate::deferred::Deferred;
use crate::result::TransactionResult;

/// Platform outcome of the pending IAP.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IapOutcome {
    /// Waiting on the store.
    Pending,
    /// The store reported success; redemption may proceed.
    Succeeded,
    /// The store reported failure with this message.
    Failed(String),
}

/// Read-only view of the pending IAP.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingIapInfo {
    /// Transaction key.
    pub transaction: String,
    /// Platform product id.
    pub product_id: String,
    /// Platform outcome so far.
    pub outcome: IapOutcome,
}

#[derive(Debug)]
pub(crate) struct PendingIap {
    pub(crate) transaction: String,
    pub(crate) product_id: String,
    pub(crate) outcome: IapOutcome,
    /// Caller-facing handle of the flow, returned to late success callbacks.
    pub(crate) handle: Deferred<TransactionResult>,
}

impl PendingIap {
    pub(crate) fn info(&self) -> PendingIapInfo {
        PendingIapInfo {
            transaction: self.transaction.clone(),
            product_id: self.product_id.clone(),
            outcome: self.outcome.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct InFlight {
    pub(crate) virtual_txn: Option<String>,
    pub(crate) iap: Option<PendingIap>,
}
