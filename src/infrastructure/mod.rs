//! Backend implementations.

pub mod in_memory;
