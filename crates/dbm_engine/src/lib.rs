//! # dbm engine
//!
//! The primitive store binding used by `dbm_core`, plus two reference
//! engines that implement it.
//!
//! This crate provides:
//! - [`Engine`] and [`StoreHandle`]: open, store, fetch, delete, exists,
//!   first/next-key cursor, reorganize, sync and set-option
//! - [`ErrorCode`] / [`EngineError`]: numeric failure codes and messages
//! - [`last_error`]: the thread-wide record of the most recent failure
//! - [`FileEngine`]: one database per OS file, guarded by advisory locks
//! - [`MemoryEngine`]: the same log format held in process memory
//!
//! Both reference engines keep an append-only record log; see [`log`] for
//! the format.
//!
//! ## Example
//!
//! ```rust
//! use dbm_engine::{
//!     logging_fatal_handler, Engine, MemoryEngine, OpenFlags, OpenMode, OpenRequest, StorePolicy,
//! };
//! use std::path::Path;
//!
//! let engine = MemoryEngine::new();
//! let request = OpenRequest {
//!     path: Path::new("fruit"),
//!     block_size: 2048,
//!     mode: OpenMode::WrCreat,
//!     flags: OpenFlags::NONE,
//!     file_mode: 0o666,
//!     fatal: logging_fatal_handler(),
//! };
//!
//! let mut handle = engine.open(&request).unwrap();
//! handle.store(b"apple", b"red", StorePolicy::Insert).unwrap();
//! assert_eq!(handle.fetch(b"apple").unwrap(), Some(b"red".to_vec()));
//! assert_eq!(handle.first_key().unwrap(), Some(b"apple".to_vec()));
//! assert_eq!(handle.next_key(b"apple").unwrap(), None);
//! handle.close();
//! ```

mod binding;
mod error;
mod file;
pub mod last_error;
pub mod log;
mod memory;
mod options;

pub use binding::{Engine, StoreHandle};
pub use error::{EngineError, EngineResult, ErrorCode};
pub use file::FileEngine;
pub use memory::MemoryEngine;
pub use options::{
    logging_fatal_handler, EngineOption, FatalHandler, OpenFlags, OpenMode, OpenRequest,
    StorePolicy,
};

/// Version of the engine crate, reported as the dbm library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
