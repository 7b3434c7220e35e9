//! Application layer: the correlation engine.
//!
//! [`store::Store`] is the entry point for fetching, purchasing, and restoring. It matches the
//! backend's out-of-order events to the calls waiting on them and calls each completion once.

pub mod store;
