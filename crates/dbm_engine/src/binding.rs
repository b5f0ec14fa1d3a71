//! The primitive store binding.
//!
//! An [`Engine`] opens databases; each successful open yields one
//! [`StoreHandle`]. The client layer only ever talks to these two traits, so
//! any dbm-like store can sit behind it.

use crate::error::EngineResult;
use crate::options::{EngineOption, OpenRequest, StorePolicy};
use std::fmt;

/// A store implementation that can open database files.
pub trait Engine: Send + Sync {
    /// Opens one handle as described by `request`.
    ///
    /// # Errors
    ///
    /// Returns the engine's failure code. Implementations also record the
    /// failure with [`crate::last_error::record`].
    fn open(&self, request: &OpenRequest<'_>) -> EngineResult<Box<dyn StoreHandle>>;
}

/// One open database session.
///
/// Dropping a handle releases it just like [`StoreHandle::close`].
pub trait StoreHandle: Send + fmt::Debug {
    /// Stores `value` under `key`.
    ///
    /// # Errors
    ///
    /// `CannotReplace` when `policy` is insert-only and the key exists,
    /// `ReaderCantStore` on a reader handle, or a write failure.
    fn store(&mut self, key: &[u8], value: &[u8], policy: StorePolicy) -> EngineResult<()>;

    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Only for unrecoverable read failures; absence is `Ok(None)`.
    fn fetch(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>>;

    /// Removes `key`.
    ///
    /// # Errors
    ///
    /// `ItemNotFound` when the key is absent, `ReaderCantDelete` on a reader
    /// handle, or a write failure.
    fn delete(&mut self, key: &[u8]) -> EngineResult<()>;

    /// Returns true if `key` is stored.
    fn exists(&self, key: &[u8]) -> bool;

    /// Returns the first key of a traversal.
    ///
    /// # Errors
    ///
    /// Only for unrecoverable read failures.
    fn first_key(&self) -> EngineResult<Option<Vec<u8>>>;

    /// Returns the key that follows `key` in traversal order.
    ///
    /// `key` does not need to be present any more; the traversal resumes at
    /// the next stored key after it.
    ///
    /// # Errors
    ///
    /// Only for unrecoverable read failures.
    fn next_key(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>>;

    /// Compacts the database file.
    ///
    /// # Errors
    ///
    /// `ReaderCantReorganize` on a reader handle or `ReorganizeFailed`.
    fn reorganize(&mut self) -> EngineResult<()>;

    /// Flushes pending writes to stable storage.
    ///
    /// # Errors
    ///
    /// A write failure.
    fn sync(&mut self) -> EngineResult<()>;

    /// Adjusts a tunable.
    ///
    /// # Errors
    ///
    /// `OptIllegal` if the value is not acceptable.
    fn set_option(&mut self, option: EngineOption) -> EngineResult<()>;

    /// Releases the handle.
    fn close(self: Box<Self>);
}
