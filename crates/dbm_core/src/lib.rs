//! # dbm core
//!
//! A hash-map-shaped client layer over dbm-style key/value stores.
//!
//! This crate provides:
//! - [`Database`]: lookup, insertion, deletion, lazy traversal and bulk
//!   transforms over an open store
//! - [`Config`] and [`OpenIntent`]: how to open a file, including the
//!   create/writer/reader fallback used when the intent is left open
//! - [`DbmError`]: closed, frozen, not-found, open and engine failures
//!
//! The store itself is reached through the [`dbm_engine::Engine`] binding;
//! [`Database::open`] uses the file engine and
//! [`Database::open_in_memory`] the memory engine.
//!
//! ## Example
//!
//! ```rust
//! use dbm_core::Database;
//!
//! let mut db = Database::open_in_memory()?;
//! db.set("a", "1")?.set("b", "2")?.set("c", "3")?;
//!
//! db.delete_where(|_, value| value == b"2")?;
//! assert_eq!(db.len()?, 2);
//!
//! let mut pairs = db.to_pairs()?;
//! pairs.sort();
//! assert_eq!(pairs[0], (b"a".to_vec(), b"1".to_vec()));
//! # Ok::<(), dbm_core::DbmError>(())
//! ```

mod config;
mod database;
mod error;
mod handle;
mod intent;
mod iter;
mod resolver;

pub use config::{Config, DEFAULT_BLOCK_SIZE, DEFAULT_FILE_MODE};
pub use database::{Database, Pair};
pub use error::{DbmError, DbmResult, OpenFailureKind};
pub use intent::{raw, OpenIntent};
pub use iter::{Iter, Keys, Values};

pub use dbm_engine::VERSION;
