//! # Fake Store
//!
//! Purchasing adapter that simulates a platform store for development and
//! tests. Purchases are approved or declined by hand, or automatically
//! depending on [`FakeStoreMode`]. Unsolicited purchases (restores,
//! purchases completed while the game was closed) can be injected at any
//! time.
//!
//! Approved purchases stay unfinalized until the engine consumes them with
//! `complete_pending_purchase`, the way real stores keep unconsumed
//! transactions around for later restores.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use crate::deferred::Completer;
use crate::purchasing::{
    LocalizedProductInfo, PurchaseData, PurchaseSink, PurchasingAdapter, PurchasingError,
    StorePlatform,
};

/// How the fake store answers `begin_purchase`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FakeStoreMode {
    /// Purchases wait for [`FakeStoreAdapter::approve_pending`] or
    /// [`FakeStoreAdapter::decline_pending`].
    Manual,
    /// Every purchase succeeds immediately.
    AutoApprove,
    /// Every purchase fails immediately with this message.
    AutoDecline(String),
}

#[derive(Debug)]
struct FakeStoreState {
    mode: FakeStoreMode,
    init_failure: Option<String>,
    products: HashMap<String, LocalizedProductInfo>,
    sink: Option<PurchaseSink>,
    requested: Option<String>,
    unfinalized: VecDeque<PurchaseData>,
    finalized: Vec<String>,
    sequence: u64,
}

impl FakeStoreState {
    fn record_purchase(&mut self, product_id: &str) {
        self.sequence += 1;
        self.unfinalized.push_back(PurchaseData {
            product_id: product_id.to_string(),
            receipt_parts: vec![format!("fake-receipt:{product_id}:{}", self.sequence)],
        });
    }
}

/// Simulated store.
#[derive(Debug)]
pub struct FakeStoreAdapter {
    state: Mutex<FakeStoreState>,
}

impl FakeStoreAdapter {
    /// Creates a fake store answering purchases per `mode`.
    #[must_use]
    pub fn new(mode: FakeStoreMode) -> Self {
        Self {
            state: Mutex::new(FakeStoreState {
                mode,
                init_failure: None,
                products: HashMap::new(),
                sink: None,
                requested: None,
                unfinalized: VecDeque::new(),
                finalized: Vec::new(),
                sequence: 0,
            }),
        }
    }

    /// Makes `initialize` fail with `message`.
    #[must_use]
    pub fn with_init_failure(self, message: impl Into<String>) -> Self {
        self.state.lock().init_failure = Some(message.into());
        self
    }

    /// Registers localized info for a product.
    #[must_use]
    pub fn with_product(
        self,
        product_id: impl Into<String>,
        name: impl Into<String>,
        price: impl Into<String>,
    ) -> Self {
        self.state.lock().products.insert(
            product_id.into(),
            LocalizedProductInfo {
                name: name.into(),
                price: price.into(),
            },
        );
        self
    }

    /// Changes how future purchases are answered.
    pub fn set_mode(&self, mode: FakeStoreMode) {
        self.state.lock().mode = mode;
    }

    /// Product of the purchase waiting for a manual answer.
    #[must_use]
    pub fn requested_purchase(&self) -> Option<String> {
        self.state.lock().requested.clone()
    }

    /// Approves the requested purchase. Returns false if none is waiting.
    pub fn approve_pending(&self) -> bool {
        let (sink, product_id) = {
            let mut state = self.state.lock();
            let Some(product_id) = state.requested.take() else {
                return false;
            };
            state.record_purchase(&product_id);
            (state.sink.clone(), product_id)
        };
        tracing::debug!("Fake store approved {}", product_id);
        sink.is_some_and(|sink| sink.purchase_succeeded(&product_id))
    }

    /// Declines the requested purchase. Returns false if none is waiting.
    pub fn decline_pending(&self, message: &str) -> bool {
        let (sink, product_id) = {
            let mut state = self.state.lock();
            let Some(product_id) = state.requested.take() else {
                return false;
            };
            (state.sink.clone(), product_id)
        };
        tracing::debug!("Fake store declined {}: {}", product_id, message);
        if let Some(sink) = sink {
            sink.purchase_failed(&product_id, message);
        }
        true
    }

    /// Simulates a purchase the game did not start. Returns false if the
    /// store is not initialized.
    pub fn inject_unsolicited(&self, product_id: &str) -> bool {
        let sink = {
            let mut state = self.state.lock();
            state.record_purchase(product_id);
            state.sink.clone()
        };
        tracing::debug!("Fake store delivering unsolicited purchase of {}", product_id);
        sink.is_some_and(|sink| sink.purchase_succeeded(product_id))
    }

    /// Purchases approved but not yet consumed.
    #[must_use]
    pub fn unfinalized_count(&self) -> usize {
        self.state.lock().unfinalized.len()
    }

    /// Products consumed so far, in order.
    #[must_use]
    pub fn finalized(&self) -> Vec<String> {
        self.state.lock().finalized.clone()
    }
}

impl PurchasingAdapter for FakeStoreAdapter {
    fn platform(&self) -> StorePlatform {
        StorePlatform::FakeStore
    }

    fn initialize(&self, sink: PurchaseSink, completer: Completer<(), PurchasingError>) {
        let failure = {
            let mut state = self.state.lock();
            let failure = state.init_failure.clone();
            if failure.is_none() {
                state.sink = Some(sink);
            }
            failure
        };
        match failure {
            Some(message) => completer.reject(PurchasingError::Unavailable(message)),
            None => completer.resolve(()),
        }
    }

    fn uninitialize(&self) {
        let mut state = self.state.lock();
        state.sink = None;
        state.requested = None;
    }

    fn begin_purchase(&self, product_id: &str, payload: Option<&str>) {
        let mode = {
            let mut state = self.state.lock();
            if state.sink.is_none() {
                tracing::warn!("Fake store is not initialized; ignoring purchase of {}", product_id);
                return;
            }
            state.requested = Some(product_id.to_string());
            state.mode.clone()
        };
        tracing::debug!(
            "Fake store purchase requested: {} (payload {:?})",
            product_id,
            payload
        );

        match mode {
            FakeStoreMode::Manual => {}
            FakeStoreMode::AutoApprove => {
                self.approve_pending();
            }
            FakeStoreMode::AutoDecline(message) => {
                self.decline_pending(&message);
            }
        }
    }

    fn current_purchase_data(&self, product_id: &str) -> Option<PurchaseData> {
        self.state
            .lock()
            .unfinalized
            .iter()
            .find(|p| p.product_id == product_id)
            .cloned()
    }

    fn complete_pending_purchase(&self, product_id: &str) {
        let mut state = self.state.lock();
        if let Some(index) = state
            .unfinalized
            .iter()
            .position(|p| p.product_id == product_id)
        {
            state.unfinalized.remove(index);
            state.finalized.push(product_id.to_string());
        }
    }

    fn restore_purchases(&self) {
        let (sink, products) = {
            let state = self.state.lock();
            let products: Vec<String> = state
                .unfinalized
                .iter()
                .map(|p| p.product_id.clone())
                .collect();
            (state.sink.clone(), products)
        };
        let Some(sink) = sink else {
            return;
        };
        for product_id in products {
            sink.purchase_succeeded(&product_id);
        }
    }

    fn localized_product_info(&self, product_id: &str) -> Option<LocalizedProductInfo> {
        self.state.lock().products.get(product_id).cloned()
    }
}
