//! # Transaction Lifecycle Events
//!
//! Published by the engine to every subscriber, fire-and-forget.
//!
//! ```text
//! BeginTransaction ──> Initiated ──> Progressed(1..n) ──> Succeeded
//!                                          │
//!                                          └────────────> Failed
//! ```

use std::sync::Arc;

use coffer_economy::TransactionDefinition;

use crate::error::TransactionError;
use crate::result::TransactionResult;

/// Event emitted by the transaction engine.
#[derive(Clone, Debug)]
pub enum TransactionEvent {
    /// A transaction flow started.
    Initiated {
        /// The transaction.
        transaction: Arc<TransactionDefinition>,
    },
    /// A flow crossed a step boundary.
    Progressed {
        /// The transaction.
        transaction: Arc<TransactionDefinition>,
        /// Steps completed.
        step: u32,
        /// Total steps.
        total: u32,
    },
    /// A flow completed and its rewards were applied.
    Succeeded {
        /// The transaction.
        transaction: Arc<TransactionDefinition>,
        /// Confirmed exchange.
        result: TransactionResult,
    },
    /// A flow ended in failure; local state was not touched by it.
    Failed {
        /// The transaction.
        transaction: Arc<TransactionDefinition>,
        /// Why it failed.
        error: TransactionError,
    },
    /// The purchasing adapter finished initializing.
    PurchasingAdapterInitializeSucceeded,
    /// The purchasing adapter failed to initialize.
    PurchasingAdapterInitializeFailed {
        /// Why initialization failed.
        error: TransactionError,
    },
}

impl TransactionEvent {
    /// Key of the transaction this event is about, if any.
    #[must_use]
    pub fn transaction_key(&self) -> Option<&str> {
        match self {
            Self::Initiated { transaction }
            | Self::Progressed { transaction, .. }
            | Self::Succeeded { transaction, .. }
            | Self::Failed { transaction, .. } => Some(transaction.key()),
            Self::PurchasingAdapterInitializeSucceeded
            | Self::PurchasingAdapterInitializeFailed { .. } => None,
        }
    }
}
