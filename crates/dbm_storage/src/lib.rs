//! # dbmap storage
//!
//! Byte stores that hold a dbm record log.
//!
//! Backends are **opaque**: they append, read back, flush and truncate bytes
//! and know nothing about headers, records or keys. The engine crate owns the
//! log format.
//!
//! ## Available Backends
//!
//! - [`FileBackend`] - one OS file per database
//! - [`InMemoryBackend`] - shared in-process buffer, used by the memory engine
//!
//! ## Example
//!
//! ```rust
//! use dbm_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"key\0value").unwrap();
//! assert_eq!(backend.read_at(offset, 9).unwrap(), b"key\0value");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
