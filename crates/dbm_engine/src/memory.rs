//! Engine keeping every database in process memory.

use crate::binding::{Engine, StoreHandle};
use crate::error::{EngineError, EngineResult, ErrorCode};
use crate::last_error;
use crate::log::{LogHandle, Medium};
use crate::options::{OpenFlags, OpenMode, OpenRequest};
use dbm_storage::{InMemoryBackend, StorageBackend};
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Default)]
struct MemoryFile {
    data: InMemoryBackend,
    readers: usize,
    writer: bool,
    /// Tells this file apart from earlier ones removed from the same path.
    generation: u64,
}

#[derive(Debug, Default)]
struct Files {
    entries: HashMap<PathBuf, MemoryFile>,
    created: u64,
}

type Registry = Arc<Mutex<Files>>;

/// Opens databases held in memory, keyed by path.
///
/// Clones share the same set of databases, which live as long as any clone
/// does. Reader and writer handles exclude each other exactly like
/// [`crate::FileEngine`] locks do.
///
/// # Example
///
/// ```rust
/// use dbm_engine::{logging_fatal_handler, Engine, MemoryEngine, OpenFlags, OpenMode, OpenRequest, StorePolicy};
/// use std::path::Path;
///
/// let engine = MemoryEngine::new();
/// let request = OpenRequest {
///     path: Path::new("scratch"),
///     block_size: 2048,
///     mode: OpenMode::WrCreat,
///     flags: OpenFlags::NONE,
///     file_mode: 0o666,
///     fatal: logging_fatal_handler(),
/// };
/// let mut handle = engine.open(&request).unwrap();
/// handle.store(b"key", b"value", StorePolicy::Replace).unwrap();
/// assert!(engine.contains(Path::new("scratch")));
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryEngine {
    files: Registry,
}

impl MemoryEngine {
    /// Creates an engine with no databases.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a database exists under `path`.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.files.lock().entries.contains_key(path)
    }

    /// Deletes the database under `path`, like unlinking a file.
    ///
    /// Open handles keep their contents, and their reader or writer holds
    /// no longer count against a database later created under `path`.
    /// Returns false if nothing was there.
    pub fn remove(&self, path: &Path) -> bool {
        self.files.lock().entries.remove(path).is_some()
    }

    /// Registers a handle on `path` and returns its buffer.
    fn attach(&self, request: &OpenRequest<'_>) -> EngineResult<(InMemoryBackend, MemoryMedium)> {
        let mode = request.mode;
        let locking = !request.flags.contains(OpenFlags::NOLOCK);
        let mut guard = self.files.lock();
        let files = &mut *guard;

        let file = match files.entries.entry(request.path.to_path_buf()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(_) if !mode.creates() => {
                return Err(EngineError::with_detail(
                    ErrorCode::FileOpenError,
                    format!("{}: no such database", request.path.display()),
                ));
            }
            Entry::Vacant(entry) => {
                files.created += 1;
                entry.insert(MemoryFile {
                    generation: files.created,
                    ..MemoryFile::default()
                })
            }
        };

        let hold = if !locking {
            Hold::None
        } else if mode.is_writer() {
            if file.writer || file.readers > 0 {
                return Err(EngineError::with_detail(
                    ErrorCode::CantBeWriter,
                    "database is in use",
                ));
            }
            file.writer = true;
            Hold::Writer
        } else {
            if file.writer {
                return Err(EngineError::with_detail(
                    ErrorCode::CantBeReader,
                    "database is open for writing",
                ));
            }
            file.readers += 1;
            Hold::Reader
        };

        if mode == OpenMode::NewDb {
            file.data.reset(Vec::new());
        }

        let medium = MemoryMedium {
            files: Arc::clone(&self.files),
            path: request.path.to_path_buf(),
            data: file.data.clone(),
            generation: file.generation,
            hold,
        };
        Ok((file.data.clone(), medium))
    }
}

impl Engine for MemoryEngine {
    fn open(&self, request: &OpenRequest<'_>) -> EngineResult<Box<dyn StoreHandle>> {
        // The registry lock is released before the log is loaded; a failed
        // load drops the medium, which takes that lock again.
        self.attach(request)
            .and_then(|(data, medium)| LogHandle::open(request, Box::new(data), Box::new(medium)))
            .map(|handle| Box::new(handle) as Box<dyn StoreHandle>)
            .inspect_err(last_error::record)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hold {
    None,
    Reader,
    Writer,
}

#[derive(Debug)]
struct MemoryMedium {
    files: Registry,
    path: PathBuf,
    data: InMemoryBackend,
    generation: u64,
    hold: Hold,
}

impl Medium for MemoryMedium {
    fn rewrite(&mut self, image: &[u8]) -> EngineResult<Box<dyn StorageBackend>> {
        self.data.reset(image.to_vec());
        Ok(Box::new(self.data.clone()))
    }
}

impl Drop for MemoryMedium {
    fn drop(&mut self) {
        let mut files = self.files.lock();
        let current = files
            .entries
            .get_mut(&self.path)
            .filter(|file| file.generation == self.generation);
        if let Some(file) = current {
            match self.hold {
                Hold::None => {}
                Hold::Reader => file.readers = file.readers.saturating_sub(1),
                Hold::Writer => file.writer = false,
            }
        }
    }
}
