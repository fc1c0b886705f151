//! # Deferred Handles
//!
//! A [`Deferred`] is the read side of an asynchronous operation: it reports
//! step progress, whether the operation is done, and its result or error.
//! The matching [`Completer`] is the write side, held by whoever drives the
//! operation (the engine's flows, a gateway, a purchasing adapter).
//!
//! ```text
//!   producer                           consumer(s)
//!   ┌───────────┐   shared state    ┌────────────┐
//!   │ Completer │ ───────────────>  │ Deferred   │  (Clone)
//!   │ set_step  │   + Notify        │ wait()     │
//!   │ resolve   │                   │ is_done()  │
//!   └───────────┘                   └────────────┘
//! ```
//!
//! A completer settles at most once. Dropping it unsettled marks the
//! operation abandoned, so waiters never hang on a producer that vanished.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Notify;

use crate::error::TransactionError;

/// Marker for an operation whose completer was dropped unsettled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Abandoned;

#[derive(Debug)]
enum Outcome<T, E> {
    Pending,
    Settled(Result<T, E>),
    Abandoned,
}

#[derive(Debug)]
struct State<T, E> {
    current_step: u32,
    total_steps: u32,
    outcome: Outcome<T, E>,
}

#[derive(Debug)]
struct Shared<T, E> {
    state: Mutex<State<T, E>>,
    notify: Notify,
}

/// Creates a connected deferred/completer pair.
#[must_use]
pub fn pair<T, E>() -> (Deferred<T, E>, Completer<T, E>) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            current_step: 0,
            total_steps: 0,
            outcome: Outcome::Pending,
        }),
        notify: Notify::new(),
    });
    (
        Deferred {
            shared: Arc::clone(&shared),
        },
        Completer { shared },
    )
}

/// Read side of an asynchronous operation.
#[derive(Debug)]
pub struct Deferred<T, E = TransactionError> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> Deferred<T, E> {
    /// A deferred that is already rejected.
    #[must_use]
    pub fn rejected(error: E) -> Self {
        let (deferred, completer) = pair();
        completer.reject(error);
        deferred
    }

    /// A deferred that is already resolved.
    #[must_use]
    pub fn resolved(value: T) -> Self {
        let (deferred, completer) = pair();
        completer.resolve(value);
        deferred
    }

    /// Steps completed so far.
    #[must_use]
    pub fn current_step(&self) -> u32 {
        self.shared.state.lock().current_step
    }

    /// Total steps the operation reports.
    #[must_use]
    pub fn total_steps(&self) -> u32 {
        self.shared.state.lock().total_steps
    }

    /// Returns true once the operation settled or was abandoned.
    #[must_use]
    pub fn is_done(&self) -> bool {
        !matches!(self.shared.state.lock().outcome, Outcome::Pending)
    }

    /// Returns true if the operation resolved successfully.
    #[must_use]
    pub fn is_fulfilled(&self) -> bool {
        matches!(self.shared.state.lock().outcome, Outcome::Settled(Ok(_)))
    }

    /// Returns true if both handles observe the same operation.
    #[must_use]
    pub fn same_operation(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<T: Clone, E: Clone + From<Abandoned>> Deferred<T, E> {
    /// The result, once resolved successfully.
    #[must_use]
    pub fn result(&self) -> Option<T> {
        match &self.shared.state.lock().outcome {
            Outcome::Settled(Ok(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// The error, once rejected or abandoned.
    #[must_use]
    pub fn error(&self) -> Option<E> {
        match &self.shared.state.lock().outcome {
            Outcome::Settled(Err(error)) => Some(error.clone()),
            Outcome::Abandoned => Some(E::from(Abandoned)),
            _ => None,
        }
    }

    fn outcome(&self) -> Option<Result<T, E>> {
        match &self.shared.state.lock().outcome {
            Outcome::Pending => None,
            Outcome::Settled(result) => Some(result.clone()),
            Outcome::Abandoned => Some(Err(E::from(Abandoned))),
        }
    }

    /// Waits until the operation is done.
    ///
    /// Suspends the calling task; never blocks the thread.
    ///
    /// # Errors
    ///
    /// Returns the rejection error, or `E::from(Abandoned)` if the producer
    /// dropped its completer without settling.
    pub async fn wait(&self) -> Result<T, E> {
        loop {
            let notified = self.shared.notify.notified();
            let mut notified = std::pin::pin!(notified);
            notified.as_mut().enable();

            if let Some(outcome) = self.outcome() {
                return outcome;
            }

            notified.await;
        }
    }
}

/// Write side of an asynchronous operation.
#[derive(Debug)]
pub struct Completer<T, E = TransactionError> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Completer<T, E> {
    /// Sets the number of steps the operation reports.
    pub fn set_total_steps(&self, total: u32) {
        self.shared.state.lock().total_steps = total;
    }

    /// Records progress.
    pub fn set_step(&self, step: u32) {
        self.shared.state.lock().current_step = step;
    }

    /// Returns a new read handle for this operation.
    #[must_use]
    pub fn deferred(&self) -> Deferred<T, E> {
        Deferred {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Resolves the operation with `value`.
    pub fn resolve(self, value: T) {
        self.settle(Ok(value));
    }

    /// Rejects the operation with `error`.
    pub fn reject(self, error: E) {
        self.settle(Err(error));
    }

    fn settle(&self, result: Result<T, E>) {
        {
            let mut state = self.shared.state.lock();
            if !matches!(state.outcome, Outcome::Pending) {
                return;
            }
            state.outcome = Outcome::Settled(result);
        }
        self.shared.notify.notify_waiters();
    }
}

impl<T, E> Drop for Completer<T, E> {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            if !matches!(state.outcome, Outcome::Pending) {
                return;
            }
            state.outcome = Outcome::Abandoned;
        }
        self.shared.notify.notify_waiters();
    }
}
