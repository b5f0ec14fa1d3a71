//! Engine storing each database in one OS file.

use crate::binding::{Engine, StoreHandle};
use crate::error::{EngineError, EngineResult, ErrorCode};
use crate::last_error;
use crate::log::{LogHandle, Medium};
use crate::options::{OpenFlags, OpenMode, OpenRequest};
use dbm_storage::{FileBackend, StorageBackend};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Suffix of the scratch file a reorganize writes before renaming it.
const REORGANIZE_SUFFIX: &str = ".reorg";

/// Opens databases as single files on the local file system.
///
/// Reader handles hold a shared advisory lock on the file and writer handles
/// an exclusive one, unless [`OpenFlags::NOLOCK`] is given. Contention is
/// reported as `CantBeReader` or `CantBeWriter` right away; opens never wait.
///
/// # Example
///
/// ```no_run
/// use dbm_engine::{logging_fatal_handler, Engine, FileEngine, OpenFlags, OpenMode, OpenRequest};
/// use std::path::Path;
///
/// let request = OpenRequest {
///     path: Path::new("words.db"),
///     block_size: 2048,
///     mode: OpenMode::WrCreat,
///     flags: OpenFlags::NONE,
///     file_mode: 0o644,
///     fatal: logging_fatal_handler(),
/// };
/// let handle = FileEngine.open(&request).unwrap();
/// handle.close();
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct FileEngine;

impl FileEngine {
    /// Creates the engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Engine for FileEngine {
    fn open(&self, request: &OpenRequest<'_>) -> EngineResult<Box<dyn StoreHandle>> {
        open_file(request)
            .map(|handle| Box::new(handle) as Box<dyn StoreHandle>)
            .inspect_err(last_error::record)
    }
}

fn open_file(request: &OpenRequest<'_>) -> EngineResult<LogHandle> {
    let mode = request.mode;
    let locking = !request.flags.contains(OpenFlags::NOLOCK);

    let mut options = OpenOptions::new();
    options
        .read(true)
        .write(mode.is_writer())
        .create(mode.creates())
        .truncate(false);
    #[cfg(unix)]
    if mode.creates() {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(request.file_mode);
    }

    let file = options.open(request.path).map_err(|err| {
        EngineError::with_detail(
            ErrorCode::FileOpenError,
            format!("{}: {err}", request.path.display()),
        )
    })?;

    if locking {
        lock(&file, mode)?;
    }

    if mode == OpenMode::NewDb {
        file.set_len(0)
            .map_err(|err| EngineError::with_detail(ErrorCode::FileWriteError, err.to_string()))?;
    }

    let backend = FileBackend::from_file(request.path, file)
        .map_err(|err| EngineError::with_detail(ErrorCode::FileReadError, err.to_string()))?;
    let medium = FileMedium {
        path: request.path.to_path_buf(),
        locking,
    };

    LogHandle::open(request, Box::new(backend), Box::new(medium))
}

fn lock(file: &File, mode: OpenMode) -> EngineResult<()> {
    if mode.is_writer() {
        file.try_lock_exclusive()
            .map_err(|err| EngineError::with_detail(ErrorCode::CantBeWriter, err.to_string()))
    } else {
        file.try_lock_shared()
            .map_err(|err| EngineError::with_detail(ErrorCode::CantBeReader, err.to_string()))
    }
}

/// Reorganize target for a file database.
///
/// The lock lives on the data file itself, so it is released when the
/// handle's backend closes the file.
#[derive(Debug)]
struct FileMedium {
    path: PathBuf,
    locking: bool,
}

impl FileMedium {
    fn scratch_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(REORGANIZE_SUFFIX);
        self.path.with_file_name(name)
    }

    fn replace_with(&self, scratch: &Path, image: &[u8]) -> std::io::Result<File> {
        let mut file = File::create(scratch)?;
        file.write_all(image)?;
        file.sync_all()?;
        drop(file);

        fs::set_permissions(scratch, fs::metadata(&self.path)?.permissions())?;
        fs::rename(scratch, &self.path)?;
        sync_parent(&self.path)?;

        OpenOptions::new().read(true).write(true).open(&self.path)
    }
}

impl Medium for FileMedium {
    fn rewrite(&mut self, image: &[u8]) -> EngineResult<Box<dyn StorageBackend>> {
        let failed = |err: &dyn std::fmt::Display| {
            EngineError::with_detail(ErrorCode::ReorganizeFailed, err.to_string())
        };

        let scratch = self.scratch_path();
        let file = self.replace_with(&scratch, image).map_err(|err| {
            // Leftover scratch file from a failed attempt.
            let _ = fs::remove_file(&scratch);
            failed(&err)
        })?;

        if self.locking {
            file.try_lock_exclusive().map_err(|err| failed(&err))?;
        }

        let backend = FileBackend::from_file(&self.path, file).map_err(|err| failed(&err))?;
        Ok(Box::new(backend))
    }
}

/// Syncs the directory holding `path` so a rename in it is durable.
#[cfg(unix)]
fn sync_parent(path: &Path) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    File::open(parent)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{logging_fatal_handler, StorePolicy};
    use tempfile::tempdir;

    fn request(path: &Path, mode: OpenMode, flags: OpenFlags) -> OpenRequest<'_> {
        OpenRequest {
            path,
            block_size: 2048,
            mode,
            flags,
            file_mode: 0o640,
            fatal: logging_fatal_handler(),
        }
    }

    fn open(path: &Path, mode: OpenMode) -> EngineResult<Box<dyn StoreHandle>> {
        FileEngine.open(&request(path, mode, OpenFlags::NONE))
    }

    #[test]
    fn reader_and_writer_need_an_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.db");

        for mode in [OpenMode::Reader, OpenMode::Writer] {
            let err = open(&path, mode).unwrap_err();
            assert_eq!(err.code(), ErrorCode::FileOpenError);
        }
        assert!(!path.exists());
        assert_eq!(last_error::last_error_code(), Some(ErrorCode::FileOpenError));
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("words.db");

        let mut handle = open(&path, OpenMode::WrCreat).unwrap();
        handle.store(b"one", b"1", StorePolicy::Replace).unwrap();
        handle.store(b"two\0", b"\02", StorePolicy::Replace).unwrap();
        handle.close();

        let handle = open(&path, OpenMode::Reader).unwrap();
        assert_eq!(handle.fetch(b"one").unwrap(), Some(b"1".to_vec()));
        assert_eq!(handle.fetch(b"two\0").unwrap(), Some(b"\02".to_vec()));
    }

    #[cfg(unix)]
    #[test]
    fn created_file_uses_requested_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("perm.db");
        open(&path, OpenMode::WrCreat).unwrap().close();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        // The process umask can only clear bits.
        assert_eq!(mode & !0o640, 0);
    }

    #[test]
    fn writer_excludes_readers_and_writers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locked.db");
        let _writer = open(&path, OpenMode::WrCreat).unwrap();

        assert_eq!(
            open(&path, OpenMode::Writer).unwrap_err().code(),
            ErrorCode::CantBeWriter
        );
        assert_eq!(
            open(&path, OpenMode::Reader).unwrap_err().code(),
            ErrorCode::CantBeReader
        );
    }

    #[test]
    fn readers_share_but_block_writers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shared.db");
        open(&path, OpenMode::WrCreat).unwrap().close();

        let _first = open(&path, OpenMode::Reader).unwrap();
        let _second = open(&path, OpenMode::Reader).unwrap();
        assert_eq!(
            open(&path, OpenMode::WrCreat).unwrap_err().code(),
            ErrorCode::CantBeWriter
        );
    }

    #[test]
    fn nolock_skips_locking() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nolock.db");
        let _writer = open(&path, OpenMode::WrCreat).unwrap();

        let reader = FileEngine
            .open(&request(&path, OpenMode::Reader, OpenFlags::NOLOCK))
            .unwrap();
        assert!(reader.first_key().unwrap().is_none());
    }

    #[test]
    fn newdb_discards_existing_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fresh.db");

        let mut handle = open(&path, OpenMode::WrCreat).unwrap();
        handle.store(b"old", b"data", StorePolicy::Replace).unwrap();
        handle.close();

        let handle = open(&path, OpenMode::NewDb).unwrap();
        assert!(handle.first_key().unwrap().is_none());
    }

    #[test]
    fn reader_on_empty_file_is_empty_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.db");
        File::create(&path).unwrap();

        assert_eq!(
            open(&path, OpenMode::Reader).unwrap_err().code(),
            ErrorCode::EmptyDatabase
        );
    }

    #[test]
    fn reorganize_shrinks_file_and_keeps_lock() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reorg.db");

        let mut handle = open(&path, OpenMode::WrCreat).unwrap();
        for round in 0..50u32 {
            handle
                .store(b"counter", &round.to_le_bytes(), StorePolicy::Replace)
                .unwrap();
        }
        let before = fs::metadata(&path).unwrap().len();

        handle.reorganize().unwrap();
        assert!(fs::metadata(&path).unwrap().len() < before);
        assert!(!dir.path().join("reorg.db.reorg").exists());
        assert_eq!(
            handle.fetch(b"counter").unwrap(),
            Some(49u32.to_le_bytes().to_vec())
        );
        assert_eq!(
            open(&path, OpenMode::Reader).unwrap_err().code(),
            ErrorCode::CantBeReader
        );

        handle.store(b"after", b"reorg", StorePolicy::Replace).unwrap();
        handle.close();

        let handle = open(&path, OpenMode::Reader).unwrap();
        assert_eq!(handle.fetch(b"after").unwrap(), Some(b"reorg".to_vec()));
    }
}
