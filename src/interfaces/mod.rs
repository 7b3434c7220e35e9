//! File formats the replay binary reads and writes.

pub mod csv;
