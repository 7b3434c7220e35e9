use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A failure reported by the purchasing backend, carried through untouched.
///
/// `code` is whatever the platform uses to classify the failure (user cancellation,
/// payment not allowed, ...). The store never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendFailure {
    pub code: i64,
    pub message: String,
}

impl BackendFailure {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Stand-in for a failed transaction the backend attached no failure to.
    pub fn unspecified() -> Self {
        Self::new(0, "Transaction failed without a reported error")
    }
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("No product found for identifier {identifier:?}")]
    NotFound { identifier: String },
    #[error("Submission rejected: {0}")]
    Submission(String),
    #[error("Transaction failed: {0}")]
    Transaction(BackendFailure),
    #[error("Restore failed: {0}")]
    Restore(BackendFailure),
    #[error("Completion dropped before it was called")]
    CompletionDropped,
    #[error("CSV error: {0}")]
    Csv(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("JSON error: {0}")]
    Json(String),
}

// csv and io errors are not Clone, completions need to be.
impl From<csv::Error> for StoreError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
