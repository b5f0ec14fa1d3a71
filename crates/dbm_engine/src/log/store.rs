//! Record log plus its in-memory key index.

use super::record::{FileHeader, LogRecord, RecordKind};
use crate::error::{EngineError, EngineResult, ErrorCode};
use dbm_storage::{StorageBackend, StorageError};
use std::collections::BTreeMap;
use std::ops::Bound;

/// Smallest block size a new database is created with.
pub const MIN_BLOCK_SIZE: u32 = 512;

fn read_failed(err: StorageError) -> EngineError {
    EngineError::with_detail(ErrorCode::FileReadError, err.to_string())
}

fn write_failed(err: StorageError) -> EngineError {
    EngineError::with_detail(ErrorCode::FileWriteError, err.to_string())
}

fn at_offset(err: EngineError, offset: u64) -> EngineError {
    let detail = match err.detail() {
        Some(detail) => format!("at offset {offset}: {detail}"),
        None => format!("at offset {offset}"),
    };
    EngineError::with_detail(err.code(), detail)
}

/// Where the latest record of a key lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    offset: u64,
    len: usize,
}

/// An append-only record log over a [`StorageBackend`].
///
/// Every live key maps to the offset of its latest put record. Superseded
/// records and delete records stay in the file as dead bytes until
/// [`LogStore::compacted_image`] is written back by a reorganize.
pub struct LogStore {
    backend: Box<dyn StorageBackend>,
    index: BTreeMap<Vec<u8>, Slot>,
    block_size: u32,
    dead_bytes: u64,
}

impl LogStore {
    /// Opens the log held by `backend`, replaying it into the index.
    ///
    /// An empty backend gets a fresh header when `writable`; a reader gets
    /// `EmptyDatabase`. A record cut short at the end of the log is ignored,
    /// and trimmed off when `writable`.
    ///
    /// # Errors
    ///
    /// `BadMagicNumber` for a foreign file, `ChecksumMismatch` or
    /// `MalformedRecord` for a damaged record, `FileReadError` or
    /// `FileWriteError` from the backend.
    pub fn load(
        mut backend: Box<dyn StorageBackend>,
        block_size: u32,
        writable: bool,
    ) -> EngineResult<Self> {
        let size = backend.size().map_err(read_failed)?;

        if size == 0 {
            if !writable {
                return Err(EngineError::new(ErrorCode::EmptyDatabase));
            }
            let header = FileHeader {
                block_size: block_size.max(MIN_BLOCK_SIZE),
            };
            backend.append(&header.encode()).map_err(write_failed)?;
            backend.flush().map_err(write_failed)?;
            return Ok(Self {
                backend,
                index: BTreeMap::new(),
                block_size: header.block_size,
                dead_bytes: 0,
            });
        }

        if size < FileHeader::SIZE as u64 {
            return Err(EngineError::with_detail(
                ErrorCode::BadMagicNumber,
                format!("file of {size} bytes is shorter than a header"),
            ));
        }

        let header_bytes = backend
            .read_at(0, FileHeader::SIZE)
            .map_err(read_failed)?;
        let header = FileHeader::decode(&header_bytes)?;

        let mut store = Self {
            backend,
            index: BTreeMap::new(),
            block_size: header.block_size,
            dead_bytes: 0,
        };
        let end = store.replay(size)?;

        if end < size {
            tracing::warn!(
                offset = end,
                dropped = size - end,
                "ignoring incomplete record at end of log"
            );
            if writable {
                store.backend.truncate(end).map_err(write_failed)?;
            }
        }

        Ok(store)
    }

    /// Applies every complete record after the header.
    ///
    /// Returns the offset just past the last complete record. A record only
    /// counts as cut short when its prefix is missing or its checked prefix
    /// promises more bytes than the log holds; a prefix that fails its own
    /// checksum is damage, not a torn tail.
    fn replay(&mut self, size: u64) -> EngineResult<u64> {
        let mut offset = FileHeader::SIZE as u64;

        while offset < size {
            if offset + LogRecord::PREFIX_SIZE as u64 > size {
                break;
            }

            let prefix = self
                .backend
                .read_at(offset, LogRecord::PREFIX_SIZE)
                .map_err(read_failed)?;
            let len = LogRecord::frame_len(&prefix).map_err(|err| at_offset(err, offset))?;

            if offset + len as u64 > size {
                break;
            }

            let data = self.backend.read_at(offset, len).map_err(read_failed)?;
            let record = LogRecord::decode(&data).map_err(|err| at_offset(err, offset))?;
            self.apply(record, Slot { offset, len });

            offset += len as u64;
        }

        Ok(offset)
    }

    fn apply(&mut self, record: LogRecord, slot: Slot) {
        match record.kind {
            RecordKind::Put => {
                if let Some(old) = self.index.insert(record.key, slot) {
                    self.dead_bytes += old.len as u64;
                }
            }
            RecordKind::Delete => {
                if let Some(old) = self.index.remove(&record.key) {
                    self.dead_bytes += old.len as u64;
                }
                self.dead_bytes += slot.len as u64;
            }
        }
    }

    fn append(&mut self, record: LogRecord) -> EngineResult<()> {
        let encoded = record.encode()?;
        let offset = self.backend.append(&encoded).map_err(write_failed)?;
        self.apply(
            record,
            Slot {
                offset,
                len: encoded.len(),
            },
        );
        Ok(())
    }

    /// Returns the value of `key`, reading its record back from the log.
    ///
    /// # Errors
    ///
    /// `FileReadError`, `ChecksumMismatch` or `MalformedRecord` if the record
    /// the index points at cannot be read back intact.
    pub fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        let Some(slot) = self.index.get(key) else {
            return Ok(None);
        };

        let data = self
            .backend
            .read_at(slot.offset, slot.len)
            .map_err(read_failed)?;
        let record = LogRecord::decode(&data)?;

        if record.kind != RecordKind::Put || record.key != key {
            return Err(EngineError::with_detail(
                ErrorCode::MalformedRecord,
                format!("index points at a foreign record at offset {}", slot.offset),
            ));
        }

        Ok(Some(record.value))
    }

    /// Returns true if `key` is live.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        self.index.contains_key(key)
    }

    /// Appends a put record for `key`.
    ///
    /// # Errors
    ///
    /// `IllegalData` if key and value are too large for one record,
    /// `FileWriteError` from the backend.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> EngineResult<()> {
        self.append(LogRecord::put(key, value))
    }

    /// Appends a delete record for `key` if it is live.
    ///
    /// Returns false when there was nothing to delete.
    ///
    /// # Errors
    ///
    /// `FileWriteError` from the backend.
    pub fn remove(&mut self, key: &[u8]) -> EngineResult<bool> {
        if !self.contains(key) {
            return Ok(false);
        }
        self.append(LogRecord::delete(key))?;
        Ok(true)
    }

    /// Returns the smallest live key.
    #[must_use]
    pub fn first_key(&self) -> Option<Vec<u8>> {
        self.index.keys().next().cloned()
    }

    /// Returns the smallest live key greater than `key`.
    #[must_use]
    pub fn next_key(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.index
            .range::<[u8], _>((Bound::Excluded(key), Bound::Unbounded))
            .next()
            .map(|(k, _)| k.clone())
    }

    /// Returns the number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if no key is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns the block size recorded in the header.
    #[must_use]
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Returns the number of bytes held by superseded or delete records.
    #[must_use]
    pub fn dead_bytes(&self) -> u64 {
        self.dead_bytes
    }

    /// Builds a log holding only the live records, in key order.
    ///
    /// # Errors
    ///
    /// Any failure reading a live record back.
    pub fn compacted_image(&self) -> EngineResult<Vec<u8>> {
        let live: usize = self.index.values().map(|slot| slot.len).sum();
        let mut image = Vec::with_capacity(FileHeader::SIZE + live);
        image.extend_from_slice(
            &FileHeader {
                block_size: self.block_size,
            }
            .encode(),
        );

        for slot in self.index.values() {
            let data = self
                .backend
                .read_at(slot.offset, slot.len)
                .map_err(read_failed)?;
            LogRecord::decode(&data)?;
            image.extend_from_slice(&data);
        }

        Ok(image)
    }

    /// Pushes buffered writes to the backend.
    ///
    /// # Errors
    ///
    /// `FileWriteError` from the backend.
    pub fn flush(&mut self) -> EngineResult<()> {
        self.backend.flush().map_err(write_failed)
    }

    /// Flushes and syncs the backend to stable storage.
    ///
    /// # Errors
    ///
    /// `FileWriteError` from the backend.
    pub fn sync(&mut self) -> EngineResult<()> {
        self.backend.flush().map_err(write_failed)?;
        self.backend.sync().map_err(write_failed)
    }
}

impl std::fmt::Debug for LogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStore")
            .field("keys", &self.index.len())
            .field("block_size", &self.block_size)
            .field("dead_bytes", &self.dead_bytes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbm_storage::InMemoryBackend;

    fn fresh() -> (InMemoryBackend, LogStore) {
        let backend = InMemoryBackend::new();
        let store = LogStore::load(Box::new(backend.clone()), 2048, true).unwrap();
        (backend, store)
    }

    fn reload(backend: &InMemoryBackend, writable: bool) -> EngineResult<LogStore> {
        LogStore::load(Box::new(backend.clone()), 2048, writable)
    }

    #[test]
    fn empty_backend_needs_a_writer() {
        let err = LogStore::load(Box::new(InMemoryBackend::new()), 2048, false).unwrap_err();
        assert_eq!(err.code(), ErrorCode::EmptyDatabase);

        let (backend, store) = fresh();
        assert!(store.is_empty());
        assert_eq!(backend.size().unwrap(), FileHeader::SIZE as u64);
    }

    #[test]
    fn small_block_size_is_rounded_up() {
        let store = LogStore::load(Box::new(InMemoryBackend::new()), 16, true).unwrap();
        assert_eq!(store.block_size(), MIN_BLOCK_SIZE);
    }

    #[test]
    fn replay_restores_latest_values() {
        let (backend, mut store) = fresh();
        store.put(b"a", b"1").unwrap();
        store.put(b"b", b"2").unwrap();
        store.put(b"a", b"3").unwrap();
        assert!(store.remove(b"b").unwrap());
        assert!(!store.remove(b"b").unwrap());

        let reopened = reload(&backend, false).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get(b"a").unwrap(), Some(b"3".to_vec()));
        assert_eq!(reopened.get(b"b").unwrap(), None);
        assert_eq!(reopened.dead_bytes(), store.dead_bytes());
    }

    #[test]
    fn cursor_walks_keys_in_order() {
        let (_, mut store) = fresh();
        for key in [b"c".as_slice(), b"a", b"b"] {
            store.put(key, b"v").unwrap();
        }

        assert_eq!(store.first_key(), Some(b"a".to_vec()));
        assert_eq!(store.next_key(b"a"), Some(b"b".to_vec()));
        assert_eq!(store.next_key(b"c"), None);
        // A key that is no longer live still has a successor.
        assert_eq!(store.next_key(b"aa"), Some(b"b".to_vec()));
    }

    #[test]
    fn torn_tail_is_trimmed_by_writers_only() {
        let (backend, mut store) = fresh();
        store.put(b"kept", b"value").unwrap();
        let good = backend.size().unwrap();

        let partial = LogRecord::put(b"lost", b"value").encode().unwrap();
        let mut data = backend.data();
        data.extend_from_slice(&partial[..partial.len() - 3]);
        backend.reset(data);

        let reader = reload(&backend, false).unwrap();
        assert_eq!(reader.len(), 1);
        assert!(backend.size().unwrap() > good);

        let writer = reload(&backend, true).unwrap();
        assert_eq!(writer.len(), 1);
        assert_eq!(backend.size().unwrap(), good);
    }

    #[test]
    fn record_cut_inside_its_prefix_is_a_torn_tail() {
        let (backend, mut store) = fresh();
        store.put(b"kept", b"value").unwrap();
        let good = backend.size().unwrap();

        let partial = LogRecord::put(b"lost", b"value").encode().unwrap();
        let mut data = backend.data();
        data.extend_from_slice(&partial[..LogRecord::PREFIX_SIZE - 1]);
        backend.reset(data);

        let writer = reload(&backend, true).unwrap();
        assert_eq!(writer.len(), 1);
        assert_eq!(backend.size().unwrap(), good);
    }

    #[test]
    fn damaged_length_prefix_fails_the_load_and_keeps_the_file() {
        let (backend, mut store) = fresh();
        for (key, value) in [(b"a", b"1"), (b"b", b"2"), (b"c", b"3")] {
            store.put(key, value).unwrap();
        }
        let record_len = LogRecord::put(b"c", b"3").encoded_size();
        let intact = backend.data();

        // Either flip makes the length point past the end of the log.
        for at in [FileHeader::SIZE + 3, intact.len() - record_len] {
            let mut data = intact.clone();
            data[at] ^= 0x40;
            backend.reset(data);
            let size_before = backend.size().unwrap();

            for writable in [true, false] {
                let err = reload(&backend, writable).unwrap_err();
                assert_eq!(err.code(), ErrorCode::ChecksumMismatch);
                assert_eq!(backend.size().unwrap(), size_before);
            }
        }
    }

    #[test]
    fn corrupt_record_fails_the_load() {
        let (backend, mut store) = fresh();
        store.put(b"key", b"value").unwrap();

        let mut data = backend.data();
        let last = data.len() - 6;
        data[last] ^= 0xFF;
        backend.reset(data);

        let err = reload(&backend, true).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ChecksumMismatch);
    }

    #[test]
    fn foreign_file_is_bad_magic() {
        let backend = InMemoryBackend::with_data(b"this is not a database file".to_vec());
        let err = reload(&backend, true).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadMagicNumber);

        let backend = InMemoryBackend::with_data(b"DBML".to_vec());
        let err = reload(&backend, true).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadMagicNumber);
    }

    #[test]
    fn compacted_image_drops_dead_records() {
        let (backend, mut store) = fresh();
        store.put(b"a", b"1").unwrap();
        store.put(b"a", b"2").unwrap();
        store.put(b"b", b"x").unwrap();
        store.remove(b"b").unwrap();
        assert!(store.dead_bytes() > 0);

        let image = store.compacted_image().unwrap();
        assert!((image.len() as u64) < backend.size().unwrap());

        let compacted = LogStore::load(Box::new(InMemoryBackend::with_data(image)), 0, false).unwrap();
        assert_eq!(compacted.len(), 1);
        assert_eq!(compacted.get(b"a").unwrap(), Some(b"2".to_vec()));
        assert_eq!(compacted.dead_bytes(), 0);
        assert_eq!(compacted.block_size(), 2048);
    }
}
