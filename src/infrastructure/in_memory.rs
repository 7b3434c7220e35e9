use crate::domain::ports::{BackendEvent, PurchaseBackend};
use crate::domain::product::Product;
use crate::domain::transaction::{Transaction, TransactionState};
use crate::error::{BackendFailure, Result, StoreError};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::debug;

/// Fetch handle issued by [`InMemoryBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

type InMemoryEvent = BackendEvent<Product, Transaction, RequestId>;

#[derive(Default)]
struct State {
    catalog: HashMap<String, Product>,
    payments_disabled: bool,
    lose_acknowledgements: bool,
    purchase_failures: HashMap<String, BackendFailure>,
    restore_failure: Option<BackendFailure>,
    next_request: u64,
    next_transaction: u64,
    issued_requests: Vec<RequestId>,
    submitted: Vec<String>,
    history: Vec<String>,
    unfinished: Vec<Transaction>,
    acknowledged: Vec<Transaction>,
}

impl State {
    fn next_transaction_id(&mut self) -> u64 {
        self.next_transaction += 1;
        self.next_transaction
    }
}

/// A purchasing backend simulated in memory.
///
/// Every result is reported through the event sink, never from inside the call that caused
/// it. Terminal transactions stay queued until acknowledged with `complete` and can be
/// re-emitted with [`InMemoryBackend::redeliver_unfinished`].
pub struct InMemoryBackend {
    state: Mutex<State>,
    events: mpsc::UnboundedSender<InMemoryEvent>,
}

impl InMemoryBackend {
    pub fn new(
        catalog: impl IntoIterator<Item = Product>,
        events: mpsc::UnboundedSender<InMemoryEvent>,
    ) -> Self {
        let state = State {
            catalog: catalog
                .into_iter()
                .map(|product| (product.identifier.clone(), product))
                .collect(),
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: InMemoryEvent) {
        if self.events.send(event).is_err() {
            debug!("no event loop listening, dropping backend event");
        }
    }

    pub fn set_can_make_payments(&self, allowed: bool) {
        self.lock().payments_disabled = !allowed;
    }

    /// Purchases of `identifier` end in a failed transaction carrying `failure`.
    pub fn fail_purchases(&self, identifier: impl Into<String>, failure: BackendFailure) {
        self.lock().purchase_failures.insert(identifier.into(), failure);
    }

    pub fn fail_restore(&self, failure: BackendFailure) {
        self.lock().restore_failure = Some(failure);
    }

    /// While set, `complete` is recorded but the transaction stays queued, as if the
    /// acknowledgement never reached the platform.
    pub fn set_lose_acknowledgements(&self, lose: bool) {
        self.lock().lose_acknowledgements = lose;
    }

    /// Re-emits every terminal transaction not yet acknowledged.
    pub fn redeliver_unfinished(&self) {
        let unfinished = self.lock().unfinished.clone();
        if !unfinished.is_empty() {
            self.emit(BackendEvent::TransactionsUpdated(unfinished));
        }
    }

    /// Identifiers passed to `purchase`, in submission order.
    pub fn submitted_purchases(&self) -> Vec<String> {
        self.lock().submitted.clone()
    }

    pub fn acknowledged(&self) -> Vec<Transaction> {
        self.lock().acknowledged.clone()
    }

    pub fn unfinished_count(&self) -> usize {
        self.lock().unfinished.len()
    }

    pub fn issued_requests(&self) -> Vec<RequestId> {
        self.lock().issued_requests.clone()
    }
}

impl PurchaseBackend for InMemoryBackend {
    type Product = Product;
    type Transaction = Transaction;
    type Request = RequestId;

    fn can_make_payments(&self) -> bool {
        !self.lock().payments_disabled
    }

    fn fetch_product(&self, identifier: &str) -> RequestId {
        let (request, products) = {
            let mut state = self.lock();
            state.next_request += 1;
            let request = RequestId(state.next_request);
            state.issued_requests.push(request);
            let products: Vec<Product> =
                state.catalog.get(identifier).cloned().into_iter().collect();
            (request, products)
        };
        self.emit(BackendEvent::ProductsReceived { request, products });
        request
    }

    fn purchase(&self, product: &Product) -> Result<()> {
        let updates = {
            let mut state = self.lock();
            if state.payments_disabled {
                return Err(StoreError::Submission("payments are disabled".to_string()));
            }
            let identifier = product.identifier.clone();
            state.submitted.push(identifier.clone());

            let id = state.next_transaction_id();
            let in_flight = Transaction::new(id, identifier.clone(), TransactionState::Purchasing);
            let failure = state.purchase_failures.get(&identifier).cloned();
            let terminal = match failure {
                Some(failure) => Transaction::failed(id, identifier.clone(), failure),
                None => {
                    if !state.history.contains(&identifier) {
                        state.history.push(identifier.clone());
                    }
                    Transaction::new(id, identifier, TransactionState::Purchased)
                }
            };
            state.unfinished.push(terminal.clone());
            [in_flight, terminal]
        };
        for update in updates {
            self.emit(BackendEvent::TransactionsUpdated(vec![update]));
        }
        Ok(())
    }

    fn restore_completed_transactions(&self) {
        let events = {
            let mut state = self.lock();
            if let Some(failure) = state.restore_failure.clone() {
                vec![BackendEvent::RestoreFailed(failure)]
            } else {
                let history = state.history.clone();
                let restored: Vec<Transaction> = history
                    .iter()
                    .map(|identifier| {
                        let id = state.next_transaction_id();
                        Transaction::new(id, identifier.clone(), TransactionState::Restored)
                    })
                    .collect();
                state.unfinished.extend(restored.iter().cloned());
                let mut events = Vec::new();
                if !restored.is_empty() {
                    events.push(BackendEvent::TransactionsUpdated(restored));
                }
                events.push(BackendEvent::RestoreFinished(history));
                events
            }
        };
        for event in events {
            self.emit(event);
        }
    }

    fn complete(&self, transaction: &Transaction) {
        let mut state = self.lock();
        if !state.lose_acknowledgements {
            state.unfinished.retain(|queued| queued.id != transaction.id);
        }
        state.acknowledged.push(transaction.clone());
    }
}
