use crate::domain::payment::Payment;
use crate::domain::ports::{BackendEvent, EventOf, EventStream, PurchaseBackend};
use crate::domain::product::StoreProduct;
use crate::domain::transaction::{StoreTransaction, TransactionState};
use crate::error::{BackendFailure, Result, StoreError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Called exactly once with the outcome of an operation, or dropped without being called.
pub type Completion<T> = Box<dyn FnOnce(Result<T>) + Send + 'static>;

struct PendingPurchase<P> {
    ticket: u64,
    product: P,
    completion: Completion<Payment>,
}

struct PendingFetch<P> {
    identifier: String,
    completion: Completion<P>,
}

struct Pending<B: PurchaseBackend> {
    purchases: HashMap<String, PendingPurchase<B::Product>>,
    fetches: HashMap<B::Request, PendingFetch<B::Product>>,
    restore: Option<Completion<Vec<String>>>,
    next_ticket: u64,
}

impl<B: PurchaseBackend> Default for Pending<B> {
    fn default() -> Self {
        Self {
            purchases: HashMap::new(),
            fetches: HashMap::new(),
            restore: None,
            next_ticket: 0,
        }
    }
}

/// Key under which an outstanding purchase is tracked.
fn purchase_key<P: StoreProduct>(product: &P) -> &str {
    product.identifier()
}

/// Number of entries still waiting on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingCounts {
    pub purchases: usize,
    pub fetches: usize,
    pub restore: bool,
}

struct Inner<B: PurchaseBackend> {
    backend: B,
    pending: Mutex<Pending<B>>,
}

/// Correlates store requests with the backend's asynchronous events.
///
/// Every operation returns without waiting on the backend. Its completion is called later,
/// once, when the matching event is handled. Completions never run while the internal lock
/// is held, so they may call back into the store.
///
/// Cloning is cheap; clones share the same pending state.
pub struct Store<B: PurchaseBackend> {
    inner: Arc<Inner<B>>,
}

impl<B: PurchaseBackend> Clone for Store<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: PurchaseBackend> Store<B> {
    pub fn new(backend: B) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                pending: Mutex::new(Pending::default()),
            }),
        }
    }

    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    /// Whether the backend currently allows purchases.
    pub fn is_open_for_business(&self) -> bool {
        self.inner.backend.can_make_payments()
    }

    pub fn pending_counts(&self) -> PendingCounts {
        let pending = self.lock();
        PendingCounts {
            purchases: pending.purchases.len(),
            fetches: pending.fetches.len(),
            restore: pending.restore.is_some(),
        }
    }

    // Every critical section leaves the maps consistent, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Pending<B>> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Looks up a product. Concurrent lookups for the same identifier are tracked separately,
    /// each by its own request handle.
    pub fn get_product_with<F>(&self, identifier: &str, completion: F)
    where
        F: FnOnce(Result<B::Product>) + Send + 'static,
    {
        // Held across the backend call so the response cannot be handled before it is tracked.
        let mut pending = self.lock();
        let request = self.inner.backend.fetch_product(identifier);
        trace!(identifier, ?request, "product fetch started");
        let fetch = PendingFetch {
            identifier: identifier.to_owned(),
            completion: Box::new(completion),
        };
        if let Some(stale) = pending.fetches.insert(request, fetch) {
            warn!(
                identifier = %stale.identifier,
                "backend reused a request handle, earlier fetch will not complete"
            );
        }
    }

    /// Looks up the product, then submits it for purchase.
    ///
    /// While a purchase for the same identifier is outstanding, further calls are dropped:
    /// their completion is never called and the backend is not asked again.
    pub fn purchase_product_with<F>(&self, identifier: &str, completion: F)
    where
        F: FnOnce(Result<Payment>) + Send + 'static,
    {
        let inner = Arc::downgrade(&self.inner);
        self.get_product_with(identifier, move |result| match result {
            Ok(product) => {
                if let Some(inner) = inner.upgrade() {
                    Store { inner }.submit_purchase(product, Box::new(completion));
                }
            }
            Err(err) => completion(Err(err)),
        });
    }

    fn submit_purchase(&self, product: B::Product, completion: Completion<Payment>) {
        let key = purchase_key(&product).to_owned();
        let ticket = {
            let mut pending = self.lock();
            if pending.purchases.contains_key(&key) {
                debug!(identifier = %key, "purchase already outstanding, dropping duplicate");
                return;
            }
            let ticket = pending.next_ticket;
            pending.next_ticket += 1;
            pending.purchases.insert(
                key.clone(),
                PendingPurchase {
                    ticket,
                    product: product.clone(),
                    completion,
                },
            );
            ticket
        };

        if let Err(err) = self.inner.backend.purchase(&product) {
            let rolled_back = {
                let mut pending = self.lock();
                let still_ours = pending
                    .purchases
                    .get(&key)
                    .is_some_and(|entry| entry.ticket == ticket);
                if still_ours {
                    pending.purchases.remove(&key)
                } else {
                    None
                }
            };
            if let Some(entry) = rolled_back {
                (entry.completion)(Err(err));
            }
        }
    }

    /// Asks the backend to restore completed purchases.
    ///
    /// Only one restore is tracked. A call made while another is unfinished replaces it, and
    /// the earlier completion is dropped.
    pub fn restore_purchases_with<F>(&self, completion: F)
    where
        F: FnOnce(Result<Vec<String>>) + Send + 'static,
    {
        let replaced = self.lock().restore.replace(Box::new(completion));
        if replaced.is_some() {
            debug!("replacing unfinished restore");
        }
        drop(replaced);
        self.inner.backend.restore_completed_transactions();
    }

    pub fn handle_event(&self, event: EventOf<B>) {
        match event {
            BackendEvent::ProductsReceived { request, products } => {
                self.on_products_received(request, products)
            }
            BackendEvent::RestoreFailed(failure) => self.on_restore_failed(failure),
            BackendEvent::RestoreFinished(identifiers) => self.on_restore_finished(identifiers),
            BackendEvent::TransactionsUpdated(transactions) => {
                self.on_transactions_updated(transactions)
            }
        }
    }

    /// Acknowledges every terminal transaction and completes the purchase waiting on it.
    ///
    /// Transactions still in flight are skipped. A terminal transaction nobody is waiting on
    /// (a redelivery, or a restore) is acknowledged and otherwise ignored.
    pub fn on_transactions_updated(&self, transactions: Vec<B::Transaction>) {
        let terminal: Vec<B::Transaction> = transactions
            .into_iter()
            .filter(|transaction| transaction.is_terminal())
            .collect();
        if terminal.is_empty() {
            return;
        }

        let matched: Vec<Option<PendingPurchase<B::Product>>> = {
            let mut pending = self.lock();
            terminal
                .iter()
                .map(|transaction| pending.purchases.remove(transaction.product_identifier()))
                .collect()
        };

        for (transaction, entry) in terminal.iter().zip(matched) {
            self.inner.backend.complete(transaction);
            let Some(entry) = entry else {
                trace!(
                    identifier = transaction.product_identifier(),
                    "acknowledged transaction with no purchase waiting"
                );
                continue;
            };
            let result = match (transaction.failure(), transaction.state()) {
                (Some(failure), _) => Err(StoreError::Transaction(failure.clone())),
                (None, TransactionState::Failed) => {
                    Err(StoreError::Transaction(BackendFailure::unspecified()))
                }
                (None, _) => Ok(Payment::for_product(&entry.product)),
            };
            (entry.completion)(result);
        }
    }

    /// Completes the fetch that issued `request`. Only the first product is used.
    pub fn on_products_received(&self, request: B::Request, products: Vec<B::Product>) {
        let fetch = self.lock().fetches.remove(&request);
        let Some(PendingFetch {
            identifier,
            completion,
        }) = fetch
        else {
            trace!(?request, "no fetch waiting on response");
            return;
        };
        let result = products
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound { identifier });
        completion(result);
    }

    pub fn on_restore_finished(&self, identifiers: Vec<String>) {
        let completion = self.lock().restore.take();
        match completion {
            Some(completion) => completion(Ok(identifiers)),
            None => trace!("restore finished with no restore waiting"),
        }
    }

    pub fn on_restore_failed(&self, failure: BackendFailure) {
        let completion = self.lock().restore.take();
        match completion {
            Some(completion) => completion(Err(StoreError::Restore(failure))),
            None => trace!("restore failed with no restore waiting"),
        }
    }

    /// Feeds every event from `events` into [`Store::handle_event`] until all senders are gone
    /// or the store itself is dropped.
    pub fn spawn_event_loop(&self, mut events: EventStream<B>) -> JoinHandle<()> {
        // Weak, since the backend usually owns the sender.
        let inner = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                Store { inner }.handle_event(event);
            }
            debug!("backend event stream closed");
        })
    }

    pub async fn get_product(&self, identifier: &str) -> Result<B::Product> {
        let (tx, rx) = oneshot::channel();
        self.get_product_with(identifier, move |result| {
            let _ = tx.send(result);
        });
        rx.await.map_err(|_| StoreError::CompletionDropped)?
    }

    /// Async form of [`Store::purchase_product_with`]. A call dropped as a duplicate resolves
    /// to [`StoreError::CompletionDropped`].
    pub async fn purchase_product(&self, identifier: &str) -> Result<Payment> {
        let (tx, rx) = oneshot::channel();
        self.purchase_product_with(identifier, move |result| {
            let _ = tx.send(result);
        });
        rx.await.map_err(|_| StoreError::CompletionDropped)?
    }

    pub async fn restore_purchases(&self) -> Result<Vec<String>> {
        let (tx, rx) = oneshot::channel();
        self.restore_purchases_with(move |result| {
            let _ = tx.send(result);
        });
        rx.await.map_err(|_| StoreError::CompletionDropped)?
    }
}
