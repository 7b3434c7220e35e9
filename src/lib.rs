//! Correlates in-app purchase requests with a purchasing backend's asynchronous events.
//!
//! The [`Store`] fetches products, purchases them, and restores earlier purchases through any
//! [`PurchaseBackend`]. Backends report results later, out of order, and may report the same
//! transaction more than once; the store still calls each caller's completion exactly once.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;

pub use application::store::Store;
pub use domain::ports::{BackendEvent, PurchaseBackend, event_channel};
pub use error::{BackendFailure, Result, StoreError};
