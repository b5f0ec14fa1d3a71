//! Ownership and state of the engine handle.

use crate::error::{DbmError, DbmResult};
use dbm_engine::StoreHandle;

/// Owns one engine handle and guards access to it.
///
/// States are {open, closed} × {mutable, frozen}. Closing is one-way;
/// freezing is one-way too.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    handle: Option<Box<dyn StoreHandle>>,
    frozen: bool,
}

impl Lifecycle {
    pub(crate) fn new(handle: Box<dyn StoreHandle>) -> Self {
        Self {
            handle: Some(handle),
            frozen: false,
        }
    }

    /// Returns the handle for a read.
    pub(crate) fn require_open(&self) -> DbmResult<&(dyn StoreHandle + 'static)> {
        self.handle.as_deref().ok_or(DbmError::Closed)
    }

    /// Returns the handle for a tuning call that does not change contents.
    pub(crate) fn require_open_mut(&mut self) -> DbmResult<&mut (dyn StoreHandle + 'static)> {
        self.handle.as_deref_mut().ok_or(DbmError::Closed)
    }

    /// Returns the handle for a write. Frozen wins over closed.
    pub(crate) fn require_mutable(&mut self) -> DbmResult<&mut (dyn StoreHandle + 'static)> {
        if self.frozen {
            return Err(DbmError::Frozen);
        }
        self.require_open_mut()
    }

    pub(crate) fn close(&mut self) -> DbmResult<()> {
        let handle = self.handle.take().ok_or(DbmError::Closed)?;
        handle.close();
        Ok(())
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    pub(crate) fn freeze(&mut self) {
        self.frozen = true;
    }

    pub(crate) fn is_frozen(&self) -> bool {
        self.frozen
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close();
        }
    }
}
