//! [`StoreHandle`] over a [`LogStore`].

use super::cache::ValueCache;
use super::store::LogStore;
use crate::binding::StoreHandle;
use crate::error::{EngineError, EngineResult, ErrorCode};
use crate::last_error;
use crate::options::{EngineOption, FatalHandler, OpenRequest, StorePolicy};
use dbm_storage::StorageBackend;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

/// Where a log lives, as far as rewriting it is concerned.
///
/// Engines hand one to every handle they open. Dropping it releases
/// whatever the engine holds for that handle (locks, registry counts).
pub trait Medium: Send {
    /// Atomically replaces the whole log with `image` and returns a backend
    /// positioned over the new contents.
    ///
    /// # Errors
    ///
    /// `ReorganizeFailed` if the replacement could not be made durable; the
    /// old log is then left untouched.
    fn rewrite(&mut self, image: &[u8]) -> EngineResult<Box<dyn StorageBackend>>;
}

fn is_fatal(code: ErrorCode) -> bool {
    matches!(
        code,
        ErrorCode::FileReadError
            | ErrorCode::FileWriteError
            | ErrorCode::ChecksumMismatch
            | ErrorCode::MalformedRecord
    )
}

/// An open database handle backed by a record log.
pub struct LogHandle {
    path: PathBuf,
    store: LogStore,
    medium: Box<dyn Medium>,
    writable: bool,
    sync_writes: bool,
    cache: Mutex<ValueCache>,
    fatal: FatalHandler,
    poisoned: AtomicBool,
}

impl LogHandle {
    /// Loads the log from `backend` and wraps it in a handle.
    ///
    /// # Errors
    ///
    /// Whatever [`LogStore::load`] reports.
    pub fn open(
        request: &OpenRequest<'_>,
        backend: Box<dyn StorageBackend>,
        medium: Box<dyn Medium>,
    ) -> EngineResult<Self> {
        let writable = request.mode.is_writer();
        let store = LogStore::load(backend, request.block_size, writable)?;

        tracing::debug!(
            path = %request.path.display(),
            mode = ?request.mode,
            keys = store.len(),
            "opened dbm log"
        );

        Ok(Self {
            path: request.path.to_path_buf(),
            store,
            medium,
            writable,
            sync_writes: request.flags.syncs_writes(),
            cache: Mutex::new(ValueCache::default()),
            fatal: request.fatal.clone(),
            poisoned: AtomicBool::new(false),
        })
    }

    /// Runs the fatal handler for unrecoverable failures and records the error.
    ///
    /// After a fatal failure the handle no longer touches its log on drop.
    fn fail(&self, err: EngineError) -> EngineError {
        let err = if is_fatal(err.code()) {
            self.poisoned.store(true, Ordering::SeqCst);
            (self.fatal)(&err.message());
            err.into_fatal()
        } else {
            err
        };
        last_error::record(&err);
        err
    }

    fn refuse(code: ErrorCode) -> EngineError {
        let err = EngineError::new(code);
        last_error::record(&err);
        err
    }

    fn after_write(&mut self) -> EngineResult<()> {
        if self.sync_writes {
            self.store.sync()?;
        }
        Ok(())
    }
}

impl StoreHandle for LogHandle {
    fn store(&mut self, key: &[u8], value: &[u8], policy: StorePolicy) -> EngineResult<()> {
        if !self.writable {
            return Err(Self::refuse(ErrorCode::ReaderCantStore));
        }
        if policy == StorePolicy::Insert && self.store.contains(key) {
            return Err(Self::refuse(ErrorCode::CannotReplace));
        }

        self.cache.get_mut().invalidate(key);
        self.store
            .put(key, value)
            .and_then(|()| self.after_write())
            .map_err(|err| self.fail(err))
    }

    fn fetch(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        if let Some(value) = self.cache.lock().get(key) {
            return Ok(Some(value));
        }

        let value = self.store.get(key).map_err(|err| self.fail(err))?;
        if let Some(value) = &value {
            self.cache.lock().insert(key, value);
        }
        Ok(value)
    }

    fn delete(&mut self, key: &[u8]) -> EngineResult<()> {
        if !self.writable {
            return Err(Self::refuse(ErrorCode::ReaderCantDelete));
        }

        self.cache.get_mut().invalidate(key);
        match self.store.remove(key) {
            Ok(true) => self
                .after_write()
                .map_err(|err| self.fail(err)),
            Ok(false) => Err(Self::refuse(ErrorCode::ItemNotFound)),
            Err(err) => Err(self.fail(err)),
        }
    }

    fn exists(&self, key: &[u8]) -> bool {
        self.store.contains(key)
    }

    fn first_key(&self) -> EngineResult<Option<Vec<u8>>> {
        Ok(self.store.first_key())
    }

    fn next_key(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        Ok(self.store.next_key(key))
    }

    fn reorganize(&mut self) -> EngineResult<()> {
        if !self.writable {
            return Err(Self::refuse(ErrorCode::ReaderCantReorganize));
        }

        let reclaimed = self.store.dead_bytes();
        let image = self.store.compacted_image().map_err(|err| self.fail(err))?;
        let backend = self
            .medium
            .rewrite(&image)
            .map_err(|err| self.fail(err))?;
        self.store = LogStore::load(backend, self.store.block_size(), true)
            .map_err(|err| self.fail(err))?;
        self.cache.get_mut().clear();

        tracing::info!(
            path = %self.path.display(),
            keys = self.store.len(),
            reclaimed,
            "reorganized dbm log"
        );
        Ok(())
    }

    fn sync(&mut self) -> EngineResult<()> {
        self.store.sync().map_err(|err| self.fail(err))
    }

    fn set_option(&mut self, option: EngineOption) -> EngineResult<()> {
        match option {
            EngineOption::CacheSize(size) => self
                .cache
                .get_mut()
                .set_capacity(size)
                .inspect_err(last_error::record),
            EngineOption::SyncMode(enabled) => {
                self.sync_writes = enabled;
                Ok(())
            }
        }
    }

    fn close(self: Box<Self>) {
        tracing::debug!(path = %self.path.display(), "closing dbm log");
    }
}

impl Drop for LogHandle {
    fn drop(&mut self) {
        if self.poisoned.load(Ordering::SeqCst) {
            tracing::warn!(path = %self.path.display(), "dropping damaged dbm log without flushing");
            return;
        }
        if self.writable {
            if let Err(err) = self.store.flush() {
                tracing::warn!(path = %self.path.display(), error = %err, "flush on close failed");
            }
        }
    }
}

impl std::fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogHandle")
            .field("path", &self.path)
            .field("store", &self.store)
            .field("writable", &self.writable)
            .field("sync_writes", &self.sync_writes)
            .field("poisoned", &self.poisoned.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
