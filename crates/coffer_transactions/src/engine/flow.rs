//! Shared bookkeeping for one running transaction flow.
//!
//! A [`Flow`] owns the caller's completer and the claim on an in-flight
//! slot. Every flow ends through [`Flow::succeed`] or [`Flow::fail`], which
//! release the slot first, then publish events, then settle the handle.
//! If a flow is dropped any other way the [`SlotGuard`] still frees the slot
//! and the dropped completer marks the handle abandoned.

use std::sync::Arc;

use coffer_economy::{TransactionDefinition, TransactionKind};

use super::TransactionEngine;
use crate::deferred::{Completer, Deferred};
use crate::error::TransactionError;
use crate::events::TransactionEvent;
use crate::result::TransactionResult;

/// Releases an in-flight slot exactly once.
pub(crate) struct SlotGuard {
    engine: Arc<TransactionEngine>,
    kind: TransactionKind,
    key: String,
    released: bool,
}

impl SlotGuard {
    pub(crate) fn new(engine: Arc<TransactionEngine>, kind: TransactionKind, key: String) -> Self {
        Self {
            engine,
            kind,
            key,
            released: false,
        }
    }

    pub(crate) fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.engine.clear_slot(self.kind, &self.key);
        }
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.release();
    }
}

pub(crate) struct Flow {
    pub(crate) engine: Arc<TransactionEngine>,
    pub(crate) transaction: Arc<TransactionDefinition>,
    completer: Completer<TransactionResult>,
    slot: SlotGuard,
    total: u32,
}

impl Flow {
    /// Starts a flow whose slot was already claimed: step 0 of `total`,
    /// `Initiated` published.
    pub(crate) fn start(
        engine: &Arc<TransactionEngine>,
        transaction: Arc<TransactionDefinition>,
        completer: Completer<TransactionResult>,
        total: u32,
    ) -> Self {
        completer.set_total_steps(total);
        completer.set_step(0);

        let slot = SlotGuard::new(
            Arc::clone(engine),
            transaction.kind(),
            transaction.key().to_string(),
        );

        tracing::info!("Transaction {} initiated", transaction.key());
        engine.publish(&TransactionEvent::Initiated {
            transaction: Arc::clone(&transaction),
        });

        Self {
            engine: Arc::clone(engine),
            transaction,
            completer,
            slot,
            total,
        }
    }

    pub(crate) fn key(&self) -> &str {
        self.transaction.key()
    }

    pub(crate) fn handle(&self) -> Deferred<TransactionResult> {
        self.completer.deferred()
    }

    /// Records a step boundary.
    pub(crate) fn progress(&self, step: u32) {
        self.completer.set_step(step);
        tracing::debug!("Transaction {} step {}/{}", self.key(), step, self.total);
        self.engine.publish(&TransactionEvent::Progressed {
            transaction: Arc::clone(&self.transaction),
            step,
            total: self.total,
        });
    }

    /// Terminal failure.
    pub(crate) fn fail(self, error: TransactionError) {
        let Self {
            engine,
            transaction,
            completer,
            mut slot,
            ..
        } = self;

        slot.release();
        tracing::warn!("Transaction {} failed: {}", transaction.key(), error);
        engine.record_receipt(&transaction, Err(&error));
        engine.publish(&TransactionEvent::Failed {
            transaction,
            error: error.clone(),
        });
        completer.reject(error);
    }

    /// Terminal success.
    pub(crate) fn succeed(self, result: TransactionResult) {
        let Self {
            engine,
            transaction,
            completer,
            mut slot,
            total,
        } = self;

        slot.release();
        completer.set_step(total);
        tracing::info!("Transaction {} succeeded", transaction.key());
        engine.record_receipt(&transaction, Ok(&result));
        engine.publish(&TransactionEvent::Progressed {
            transaction: Arc::clone(&transaction),
            step: total,
            total,
        });
        engine.publish(&TransactionEvent::Succeeded {
            transaction,
            result: result.clone(),
        });
        completer.resolve(result);
    }
}
