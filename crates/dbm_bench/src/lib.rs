//! Shared helpers for the dbmap benchmarks.

pub mod utils;
