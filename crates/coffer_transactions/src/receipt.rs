//! # Transaction Receipts
//!
//! Audit records for analytics and logging. A receipt is produced once per
//! finished attempt and is never consulted by the engine afterwards.

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;

use coffer_economy::ExchangeDefinition;

use crate::result::ConfirmedExchange;

/// One serialized line of a price or payout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReceiptLine {
    /// Currency moved.
    Currency {
        /// Currency key.
        currency: String,
        /// Amount.
        amount: u64,
    },
    /// Item moved.
    Item {
        /// Item definition key.
        definition: String,
        /// Instance id, when the movement was confirmed.
        instance_id: Option<String>,
        /// Number of instances this line stands for.
        amount: u64,
    },
}

impl fmt::Display for ReceiptLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Currency { currency, amount } => write!(f, "currency:{currency}x{amount}"),
            Self::Item {
                definition,
                instance_id: Some(id),
                amount,
            } => write!(f, "item:{definition}#{id}x{amount}"),
            Self::Item {
                definition,
                instance_id: None,
                amount,
            } => write!(f, "item:{definition}x{amount}"),
        }
    }
}

fn lines_from_definition(exchange: &ExchangeDefinition) -> Vec<ReceiptLine> {
    exchange
        .currencies
        .iter()
        .map(|c| ReceiptLine::Currency {
            currency: c.currency.clone(),
            amount: c.amount,
        })
        .chain(exchange.items.iter().map(|i| ReceiptLine::Item {
            definition: i.item.clone(),
            instance_id: None,
            amount: i.amount,
        }))
        .collect()
}

fn lines_from_confirmed(exchange: &ConfirmedExchange) -> Vec<ReceiptLine> {
    exchange
        .currencies
        .iter()
        .map(|c| ReceiptLine::Currency {
            currency: c.currency.clone(),
            amount: c.amount,
        })
        .chain(exchange.items.iter().map(|i| ReceiptLine::Item {
            definition: i.definition.clone(),
            instance_id: Some(i.instance_id.clone()),
            amount: 1,
        }))
        .collect()
}

fn write_lines(f: &mut fmt::Formatter<'_>, lines: &[ReceiptLine]) -> fmt::Result {
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{line}")?;
    }
    Ok(())
}

/// What the player paid.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Price {
    /// Input lines.
    pub lines: Vec<ReceiptLine>,
}

impl Price {
    /// Creates a price from input lines.
    #[must_use]
    pub fn new(lines: Vec<ReceiptLine>) -> Self {
        Self { lines }
    }
}

impl From<&ExchangeDefinition> for Price {
    fn from(exchange: &ExchangeDefinition) -> Self {
        Self::new(lines_from_definition(exchange))
    }
}

impl From<&ConfirmedExchange> for Price {
    fn from(exchange: &ConfirmedExchange) -> Self {
        Self::new(lines_from_confirmed(exchange))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_lines(f, &self.lines)
    }
}

/// What the player received.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Payout {
    /// Output lines.
    pub lines: Vec<ReceiptLine>,
}

impl Payout {
    /// Creates a payout from output lines.
    #[must_use]
    pub fn new(lines: Vec<ReceiptLine>) -> Self {
        Self { lines }
    }
}

impl From<&ExchangeDefinition> for Payout {
    fn from(exchange: &ExchangeDefinition) -> Self {
        Self::new(lines_from_definition(exchange))
    }
}

impl From<&ConfirmedExchange> for Payout {
    fn from(exchange: &ConfirmedExchange) -> Self {
        Self::new(lines_from_confirmed(exchange))
    }
}

impl fmt::Display for Payout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_lines(f, &self.lines)
    }
}

/// Audit record of one finished transaction attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransactionReceipt {
    /// Unique receipt id.
    pub id: String,
    /// Transaction key.
    pub transaction: String,
    /// Completion time (Unix epoch ms).
    pub timestamp_ms: u64,
    /// Whether the attempt succeeded.
    pub success: bool,
    /// Why it failed, if it did.
    pub failure_reason: Option<String>,
    /// Inputs: confirmed costs on success, requested costs on failure.
    pub price: Price,
    /// Outputs: confirmed rewards on success, requested rewards on failure.
    pub payout: Payout,
}

impl TransactionReceipt {
    /// Current wall clock time in Unix epoch ms.
    #[must_use]
    pub fn now_ms() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

impl fmt::Display for TransactionReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success { "ok" } else { "failed" };
        write!(
            f,
            "[{}] {} {} price=({}) payout=({})",
            self.id, self.transaction, status, self.price, self.payout
        )?;
        if let Some(reason) = &self.failure_reason {
            write!(f, " reason={reason}")?;
        }
        Ok(())
    }
}

/// Bounded history of recent receipts, oldest first.
#[derive(Debug)]
pub struct ReceiptLog {
    receipts: VecDeque<TransactionReceipt>,
    capacity: usize,
}

impl ReceiptLog {
    /// Creates a log keeping at most `capacity` receipts.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            receipts: VecDeque::new(),
            capacity,
        }
    }

    /// Appends a receipt, evicting the oldest one when full.
    pub fn push(&mut self, receipt: TransactionReceipt) {
        if self.capacity == 0 {
            return;
        }
        if self.receipts.len() == self.capacity {
            self.receipts.pop_front();
        }
        self.receipts.push_back(receipt);
    }

    /// Copies out every kept receipt, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<TransactionReceipt> {
        self.receipts.iter().cloned().collect()
    }

    /// Number of kept receipts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receipts.len()
    }

    /// Returns true if no receipt is kept.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receipts.is_empty()
    }
}
