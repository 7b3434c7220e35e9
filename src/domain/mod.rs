//! Domain types shared by the store and its backends.
//!
//! Backends hand the store their own product, transaction, and request types; the traits
//! here are the only view the store has of them.

pub mod payment;
pub mod ports;
pub mod product;
pub mod transaction;
