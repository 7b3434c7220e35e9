use crate::error::BackendFailure;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionState {
    /// Still being processed by the backend.
    Purchasing,
    /// Waiting on an outside action (e.g. parental approval).
    Deferred,
    Purchased,
    Restored,
    Failed,
}

/// What the store needs to know about a transaction update from the backend.
pub trait StoreTransaction: Send + Sync + 'static {
    fn product_identifier(&self) -> &str;
    fn state(&self) -> TransactionState;
    fn failure(&self) -> Option<&BackendFailure>;

    /// Purchased, restored, or failed. Anything else is left for a later update.
    fn is_terminal(&self) -> bool {
        matches!(
            self.state(),
            TransactionState::Purchased | TransactionState::Restored | TransactionState::Failed
        ) || self.failure().is_some()
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Transaction {
    /// Backend-assigned transaction id.
    pub id: u64,
    pub product_identifier: String,
    pub state: TransactionState,
    pub failure: Option<BackendFailure>,
}

impl Transaction {
    pub fn new(id: u64, product_identifier: impl Into<String>, state: TransactionState) -> Self {
        Self {
            id,
            product_identifier: product_identifier.into(),
            state,
            failure: None,
        }
    }

    pub fn failed(id: u64, product_identifier: impl Into<String>, failure: BackendFailure) -> Self {
        Self {
            id,
            product_identifier: product_identifier.into(),
            state: TransactionState::Failed,
            failure: Some(failure),
        }
    }
}

impl StoreTransaction for Transaction {
    fn product_identifier(&self) -> &str {
        &self.product_identifier
    }

    fn state(&self) -> TransactionState {
        self.state
    }

    fn failure(&self) -> Option<&BackendFailure> {
        self.failure.as_ref()
    }
}
