//! Storage backend trait definition.

use crate::error::StorageResult;

/// A byte store holding one database's record log.
///
/// # Invariants
///
/// - `append` returns the offset where the bytes begin
/// - `read_at` returns exactly the bytes previously written at that offset
/// - `sync` makes every appended byte durable
///
/// A backend opened for reading only may fail every mutating call; the engine
/// never issues them on a reader handle.
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::StorageError::ReadPastEnd`] when the range is not
    /// fully inside the store, or on I/O failure.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends `data` and returns the offset it was written at.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Pushes buffered writes to the operating system.
    fn flush(&mut self) -> StorageResult<()>;

    /// Returns the current size in bytes, which is also the next append offset.
    fn size(&self) -> StorageResult<u64>;

    /// Forces data and metadata to durable storage.
    fn sync(&mut self) -> StorageResult<()>;

    /// Drops every byte at or after `new_size`.
    ///
    /// Used to cut a torn tail record off the log and to empty a database.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::StorageError::TruncateBeyondEnd`] if `new_size` is
    /// larger than the current size.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;
}
