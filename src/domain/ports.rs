use super::product::StoreProduct;
use super::transaction::StoreTransaction;
use crate::error::{BackendFailure, Result};
use std::fmt::Debug;
use std::hash::Hash;
use tokio::sync::mpsc;

/// Opaque token for an outstanding product fetch. Two handles are the same request
/// only if they compare equal.
pub trait RequestHandle: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> RequestHandle for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// The purchasing platform the store drives.
///
/// None of these calls may deliver a [`BackendEvent`] before returning; results always
/// arrive later, usually on a thread the caller does not own.
pub trait PurchaseBackend: Send + Sync + 'static {
    type Product: StoreProduct;
    type Transaction: StoreTransaction;
    type Request: RequestHandle;

    fn can_make_payments(&self) -> bool;
    fn fetch_product(&self, identifier: &str) -> Self::Request;
    fn purchase(&self, product: &Self::Product) -> Result<()>;
    fn restore_completed_transactions(&self);
    /// Acknowledges a transaction so it is not delivered again.
    fn complete(&self, transaction: &Self::Transaction);
}

/// Everything a backend reports back to the store.
#[derive(Debug, Clone)]
pub enum BackendEvent<P, T, R> {
    ProductsReceived { request: R, products: Vec<P> },
    RestoreFailed(BackendFailure),
    RestoreFinished(Vec<String>),
    TransactionsUpdated(Vec<T>),
}

pub type EventOf<B> = BackendEvent<
    <B as PurchaseBackend>::Product,
    <B as PurchaseBackend>::Transaction,
    <B as PurchaseBackend>::Request,
>;

pub type EventSink<B> = mpsc::UnboundedSender<EventOf<B>>;
pub type EventStream<B> = mpsc::UnboundedReceiver<EventOf<B>>;

/// Creates the channel a backend uses to report events to a store's event loop.
pub fn event_channel<B: PurchaseBackend>() -> (EventSink<B>, EventStream<B>) {
    mpsc::unbounded_channel()
}
