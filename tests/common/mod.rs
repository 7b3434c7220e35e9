#![allow(dead_code)]

use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use storekeep::domain::ports::PurchaseBackend;
use storekeep::domain::product::Product;
use storekeep::domain::transaction::{Transaction, TransactionState};
use storekeep::error::{BackendFailure, Result, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FakeRequest(pub u64);

#[derive(Default)]
struct Calls {
    next_request: u64,
    fetches: Vec<(String, FakeRequest)>,
    purchases: Vec<String>,
    completed: Vec<Transaction>,
    restores: usize,
    reject_purchases: bool,
}

/// Backend double that records every call and never emits anything on its own.
/// Tests play the backend's part by calling the store's event handlers directly.
#[derive(Default)]
pub struct RecordingBackend {
    calls: Mutex<Calls>,
    open: AtomicBool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_can_make_payments(&self, allowed: bool) {
        self.open.store(allowed, Ordering::SeqCst);
    }

    pub fn reject_purchases(&self, reject: bool) {
        self.calls.lock().unwrap().reject_purchases = reject;
    }

    pub fn fetches(&self) -> Vec<(String, FakeRequest)> {
        self.calls.lock().unwrap().fetches.clone()
    }

    /// Request handle of the most recent fetch.
    pub fn last_request(&self) -> FakeRequest {
        self.calls.lock().unwrap().fetches.last().unwrap().1
    }

    pub fn purchases(&self) -> Vec<String> {
        self.calls.lock().unwrap().purchases.clone()
    }

    pub fn completed(&self) -> Vec<Transaction> {
        self.calls.lock().unwrap().completed.clone()
    }

    pub fn restores(&self) -> usize {
        self.calls.lock().unwrap().restores
    }
}

impl PurchaseBackend for RecordingBackend {
    type Product = Product;
    type Transaction = Transaction;
    type Request = FakeRequest;

    fn can_make_payments(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn fetch_product(&self, identifier: &str) -> FakeRequest {
        let mut calls = self.calls.lock().unwrap();
        calls.next_request += 1;
        let request = FakeRequest(calls.next_request);
        calls.fetches.push((identifier.to_string(), request));
        request
    }

    fn purchase(&self, product: &Product) -> Result<()> {
        let mut calls = self.calls.lock().unwrap();
        calls.purchases.push(product.identifier.clone());
        if calls.reject_purchases {
            return Err(StoreError::Submission("rejected".to_string()));
        }
        Ok(())
    }

    fn restore_completed_transactions(&self) {
        self.calls.lock().unwrap().restores += 1;
    }

    fn complete(&self, transaction: &Transaction) {
        self.calls.lock().unwrap().completed.push(transaction.clone());
    }
}

/// Collects every result a completion is called with.
pub struct Recorder<T> {
    calls: Arc<Mutex<Vec<Result<T>>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<T: Clone + Send + 'static> Recorder<T> {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn completion(&self) -> impl FnOnce(Result<T>) + Send + 'static {
        let calls = Arc::clone(&self.calls);
        move |result| calls.lock().unwrap().push(result)
    }

    pub fn calls(&self) -> Vec<Result<T>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

pub fn gems() -> Product {
    Product::new("com.example.gems", dec!(0.99), Some("USD"))
}

pub fn coins() -> Product {
    Product::new("com.example.coins", dec!(4.99), Some("EUR"))
}

pub fn purchased(id: u64, identifier: &str) -> Transaction {
    Transaction::new(id, identifier, TransactionState::Purchased)
}

pub fn declined(id: u64, identifier: &str) -> Transaction {
    Transaction::failed(id, identifier, BackendFailure::new(2, "Payment cancelled"))
}
