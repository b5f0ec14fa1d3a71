//! Bounded cache of fetched values.

use crate::error::{EngineError, EngineResult, ErrorCode};
use lru::LruCache;
use std::fmt;
use std::num::NonZeroUsize;

/// Entries kept when the caller never sets a size.
pub const DEFAULT_CACHE_SIZE: usize = 100;

/// Fetched values keyed by key, evicting the least recently used.
pub struct ValueCache {
    entries: LruCache<Vec<u8>, Vec<u8>>,
}

impl Default for ValueCache {
    fn default() -> Self {
        Self::with_capacity(NonZeroUsize::new(DEFAULT_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN))
    }
}

impl fmt::Debug for ValueCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueCache")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

impl ValueCache {
    /// Creates an empty cache holding at most `capacity` values.
    #[must_use]
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Returns the configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Returns the number of cached values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a copy of the cached value for `key` and marks it recently used.
    pub fn get(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    /// Caches `value` under `key`.
    pub fn insert(&mut self, key: &[u8], value: &[u8]) {
        self.entries.put(key.to_vec(), value.to_vec());
    }

    /// Forgets `key`.
    pub fn invalidate(&mut self, key: &[u8]) {
        self.entries.pop(key);
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Changes the capacity, evicting the least recently used values that
    /// no longer fit.
    ///
    /// # Errors
    ///
    /// `OptIllegal` for a capacity of zero.
    pub fn set_capacity(&mut self, capacity: usize) -> EngineResult<()> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
            EngineError::with_detail(ErrorCode::OptIllegal, "cache size must be positive")
        })?;
        self.entries.resize(capacity);
        Ok(())
    }
}
