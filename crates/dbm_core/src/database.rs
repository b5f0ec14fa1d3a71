//! The associative container over an open database.

use crate::config::Config;
use crate::error::{DbmError, DbmResult};
use crate::handle::Lifecycle;
use crate::intent::OpenIntent;
use crate::iter::{accumulate, Iter, Keys, Values};
use crate::resolver::resolve;
use dbm_engine::{
    Engine, EngineError, EngineOption, ErrorCode, FileEngine, MemoryEngine, StorePolicy,
};
use std::collections::HashMap;
use std::fmt;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

/// A key/value pair as stored.
pub type Pair = (Vec<u8>, Vec<u8>);

/// An open dbm database used as a byte-keyed map.
///
/// Keys and values are arbitrary byte strings; embedded NUL bytes round-trip.
/// Traversal order is whatever the engine's cursor yields and must not be
/// relied upon.
///
/// # Opening a Database
///
/// ```rust,no_run
/// use dbm_core::{Config, Database, OpenIntent};
///
/// // Create if missing, else open for writing, else for reading.
/// let mut db = Database::open("fruit.db")?;
/// db.set("apple", "red")?.set("lime", "green")?;
/// assert_eq!(db.get("apple")?, Some(b"red".to_vec()));
///
/// // Read-only, no fallback.
/// let config = Config::new().intent(OpenIntent::reader());
/// # drop(db);
/// let reader = Database::open_with_config("fruit.db", config)?;
/// # Ok::<(), dbm_core::DbmError>(())
/// ```
///
/// # In-Memory Databases
///
/// ```rust
/// use dbm_core::Database;
///
/// let mut db = Database::open_in_memory()?;
/// db.set(b"k\0ey", b"value")?;
/// assert_eq!(db.len()?, 1);
/// # Ok::<(), dbm_core::DbmError>(())
/// ```
pub struct Database {
    path: PathBuf,
    lifecycle: Lifecycle,
}

impl Database {
    /// Opens or creates the database file at `path` with the default config.
    ///
    /// # Errors
    ///
    /// [`DbmError::Open`] if the file can be neither created nor opened.
    pub fn open(path: impl AsRef<Path>) -> DbmResult<Self> {
        Self::open_with_config(path, Config::default())?
            .ok_or_else(|| DbmError::open(&EngineError::new(ErrorCode::FileOpenError)))
    }

    /// Opens the database file at `path` as `config` describes.
    ///
    /// Returns `Ok(None)` if no mode could be opened and `config.file_mode`
    /// is `None`.
    ///
    /// # Errors
    ///
    /// [`DbmError::Open`] if no mode could be opened and a file mode was set.
    pub fn open_with_config(path: impl AsRef<Path>, config: Config) -> DbmResult<Option<Self>> {
        Self::open_with_engine(&FileEngine, path, config)
    }

    /// Opens `path` through any engine.
    ///
    /// # Errors
    ///
    /// As [`Database::open_with_config`].
    pub fn open_with_engine(
        engine: &dyn Engine,
        path: impl AsRef<Path>,
        config: Config,
    ) -> DbmResult<Option<Self>> {
        let path = path.as_ref();
        let handle = resolve(engine, path, &config)?;
        Ok(handle.map(|handle| Self {
            path: path.to_path_buf(),
            lifecycle: Lifecycle::new(handle),
        }))
    }

    /// Opens a fresh, private in-memory database.
    ///
    /// # Errors
    ///
    /// Only if the engine fails to initialise the database.
    pub fn open_in_memory() -> DbmResult<Self> {
        let config = Config::default().intent(OpenIntent::create());
        Self::open_with_engine(&MemoryEngine::new(), ":memory:", config)?
            .ok_or_else(|| DbmError::open(&EngineError::new(ErrorCode::FileOpenError)))
    }

    /// Opens `path`, runs `f` on the database and closes it afterwards.
    ///
    /// The database is closed even when `f` fails, unless `f` already closed
    /// it or failed with [`DbmError::Fatal`]. A fatally damaged database is
    /// only released, without the final flush. Returns `Ok(None)` without
    /// calling `f` in the same case where [`Database::open_with_config`]
    /// returns `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Open failures, then whatever `f` returns.
    pub fn with_database<R, F>(path: impl AsRef<Path>, config: Config, f: F) -> DbmResult<Option<R>>
    where
        F: FnOnce(&mut Self) -> DbmResult<R>,
    {
        let Some(mut db) = Self::open_with_config(path, config)? else {
            return Ok(None);
        };
        let result = f(&mut db);
        if result.as_ref().is_err_and(DbmError::is_fatal) {
            tracing::error!(path = %db.path.display(), "abandoning damaged database");
            return result.map(Some);
        }
        if !db.is_closed() {
            db.close()?;
        }
        result.map(Some)
    }

    /// Returns the path the database was opened with.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Closes the database.
    ///
    /// # Errors
    ///
    /// [`DbmError::Closed`] if it was already closed.
    pub fn close(&mut self) -> DbmResult<()> {
        self.lifecycle.close()?;
        tracing::debug!(path = %self.path.display(), "closed database");
        Ok(())
    }

    /// Returns true after [`Database::close`].
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lifecycle.is_closed()
    }

    /// Makes every later mutation fail with [`DbmError::Frozen`].
    pub fn freeze(&mut self) -> &mut Self {
        self.lifecycle.freeze();
        self
    }

    /// Returns true after [`Database::freeze`].
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.lifecycle.is_frozen()
    }

    // ------------------------------------------------------------------
    // Single keys
    // ------------------------------------------------------------------

    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// [`DbmError::Closed`], or a fatal engine failure. Absence is `Ok(None)`.
    pub fn get(&self, key: impl AsRef<[u8]>) -> DbmResult<Option<Vec<u8>>> {
        Ok(self.lifecycle.require_open()?.fetch(key.as_ref())?)
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// [`DbmError::Frozen`], [`DbmError::Closed`], or [`DbmError::Store`] with
    /// the engine's message (e.g. the database is open read-only).
    pub fn set(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> DbmResult<&mut Self> {
        self.lifecycle
            .require_mutable()?
            .store(key.as_ref(), value.as_ref(), StorePolicy::Replace)?;
        Ok(self)
    }

    /// Same as [`Database::set`].
    ///
    /// # Errors
    ///
    /// As [`Database::set`].
    pub fn store(
        &mut self,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
    ) -> DbmResult<&mut Self> {
        self.set(key, value)
    }

    /// Returns true if `key` is stored.
    ///
    /// # Errors
    ///
    /// [`DbmError::Closed`].
    pub fn contains_key(&self, key: impl AsRef<[u8]>) -> DbmResult<bool> {
        Ok(self.lifecycle.require_open()?.exists(key.as_ref()))
    }

    /// Removes `key` and returns the value it had.
    ///
    /// An absent key is not an error: the result is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// [`DbmError::Frozen`], [`DbmError::Closed`], or any engine failure other
    /// than the key being absent.
    pub fn delete(&mut self, key: impl AsRef<[u8]>) -> DbmResult<Option<Vec<u8>>> {
        let key = key.as_ref();
        let handle = self.lifecycle.require_mutable()?;
        let value = handle.fetch(key)?;

        match handle.delete(key) {
            Ok(()) => Ok(value),
            Err(err) if err.code() == ErrorCode::ItemNotFound => Ok(value),
            Err(err) => Err(err.into()),
        }
    }

    /// Removes `key`, returning its value or, if it was absent, `absent(key)`.
    ///
    /// # Errors
    ///
    /// As [`Database::delete`].
    pub fn delete_or_else<F>(&mut self, key: impl AsRef<[u8]>, absent: F) -> DbmResult<Vec<u8>>
    where
        F: FnOnce(&[u8]) -> Vec<u8>,
    {
        let key = key.as_ref();
        Ok(match self.delete(key)? {
            Some(value) => value,
            None => absent(key),
        })
    }

    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// [`DbmError::KeyNotFound`] if the key is absent.
    pub fn fetch(&self, key: impl AsRef<[u8]>) -> DbmResult<Vec<u8>> {
        self.get(key)?.ok_or(DbmError::KeyNotFound)
    }

    /// Returns the value stored under `key`, or `default`.
    ///
    /// # Errors
    ///
    /// [`DbmError::Closed`], or a fatal engine failure.
    pub fn fetch_or(&self, key: impl AsRef<[u8]>, default: impl Into<Vec<u8>>) -> DbmResult<Vec<u8>> {
        Ok(self.get(key)?.unwrap_or_else(|| default.into()))
    }

    /// Returns the value stored under `key`, or `absent(key)`.
    ///
    /// # Errors
    ///
    /// [`DbmError::Closed`], or a fatal engine failure.
    pub fn fetch_or_else<F>(&self, key: impl AsRef<[u8]>, absent: F) -> DbmResult<Vec<u8>>
    where
        F: FnOnce(&[u8]) -> Vec<u8>,
    {
        let key = key.as_ref();
        Ok(match self.get(key)? {
            Some(value) => value,
            None => absent(key),
        })
    }

    /// Returns the first key of a traversal.
    ///
    /// # Errors
    ///
    /// [`DbmError::Closed`], or a fatal engine failure.
    pub fn first_key(&self) -> DbmResult<Option<Vec<u8>>> {
        Ok(self.lifecycle.require_open()?.first_key()?)
    }

    /// Returns the key after `key` in traversal order.
    ///
    /// # Errors
    ///
    /// [`DbmError::Closed`], or a fatal engine failure.
    pub fn next_key(&self, key: impl AsRef<[u8]>) -> DbmResult<Option<Vec<u8>>> {
        Ok(self.lifecycle.require_open()?.next_key(key.as_ref())?)
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    /// Returns a lazy iterator over `(key, value)` pairs.
    ///
    /// # Errors
    ///
    /// [`DbmError::Closed`].
    pub fn iter(&self) -> DbmResult<Iter<'_>> {
        Ok(Iter::new(self.lifecycle.require_open()?))
    }

    /// Returns a lazy iterator over keys.
    ///
    /// # Errors
    ///
    /// [`DbmError::Closed`].
    pub fn iter_keys(&self) -> DbmResult<Keys<'_>> {
        Ok(Keys::new(self.lifecycle.require_open()?))
    }

    /// Returns a lazy iterator over values.
    ///
    /// # Errors
    ///
    /// [`DbmError::Closed`].
    pub fn iter_values(&self) -> DbmResult<Values<'_>> {
        Ok(Values::new(self.lifecycle.require_open()?))
    }

    /// Calls `f` with every pair.
    ///
    /// # Errors
    ///
    /// The first traversal failure.
    pub fn for_each_pair<F>(&self, mut f: F) -> DbmResult<&Self>
    where
        F: FnMut(&[u8], &[u8]),
    {
        for pair in self.iter()? {
            let (key, value) = pair?;
            f(&key, &value);
        }
        Ok(self)
    }

    /// Calls `f` with every key.
    ///
    /// # Errors
    ///
    /// The first traversal failure.
    pub fn for_each_key<F>(&self, mut f: F) -> DbmResult<&Self>
    where
        F: FnMut(&[u8]),
    {
        for key in self.iter_keys()? {
            f(&key?);
        }
        Ok(self)
    }

    /// Calls `f` with every value.
    ///
    /// # Errors
    ///
    /// The first traversal failure.
    pub fn for_each_value<F>(&self, mut f: F) -> DbmResult<&Self>
    where
        F: FnMut(&[u8]),
    {
        for value in self.iter_values()? {
            f(&value?);
        }
        Ok(self)
    }

    /// Counts the entries with a full traversal.
    ///
    /// # Errors
    ///
    /// The first traversal failure.
    pub fn len(&self) -> DbmResult<usize> {
        accumulate(self.iter_keys()?, 0, |n, _| ControlFlow::Continue(n + 1))
    }

    /// Returns true if there are no entries.
    ///
    /// # Errors
    ///
    /// [`DbmError::Closed`], or a fatal engine failure.
    pub fn is_empty(&self) -> DbmResult<bool> {
        Ok(self.first_key()?.is_none())
    }

    // ------------------------------------------------------------------
    // Bulk mutation
    // ------------------------------------------------------------------

    /// Deletes every entry for which `predicate` returns true.
    ///
    /// Matching keys are collected during one full traversal and deleted
    /// afterwards, so the traversal never sees its own deletions.
    ///
    /// # Errors
    ///
    /// [`DbmError::Frozen`], [`DbmError::Closed`], or the first failure of
    /// either phase. Deletions already made are kept.
    pub fn delete_where<F>(&mut self, mut predicate: F) -> DbmResult<&mut Self>
    where
        F: FnMut(&[u8], &[u8]) -> bool,
    {
        self.lifecycle.require_mutable()?;

        let doomed = accumulate(self.iter()?, Vec::new(), |mut doomed, (key, value)| {
            if predicate(&key, &value) {
                doomed.push(key);
            }
            ControlFlow::Continue(doomed)
        })?;

        for key in doomed {
            self.delete(&key)?;
        }
        Ok(self)
    }

    /// Deletes every entry.
    ///
    /// # Errors
    ///
    /// [`DbmError::Frozen`], [`DbmError::Closed`], or [`DbmError::Store`] on
    /// the first failed delete. Deletions already made are kept.
    pub fn clear(&mut self) -> DbmResult<&mut Self> {
        let handle = self.lifecycle.require_mutable()?;
        while let Some(key) = handle.first_key()? {
            handle.delete(&key)?;
        }
        Ok(self)
    }

    /// Removes every entry, then stores every pair of `pairs`.
    ///
    /// # Errors
    ///
    /// As [`Database::clear`] and [`Database::merge_from`]. Not atomic.
    pub fn replace_all<I, K, V>(&mut self, pairs: I) -> DbmResult<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        self.clear()?.merge_from(pairs)
    }

    /// Stores every pair of `pairs`; later pairs win over earlier ones.
    ///
    /// # Errors
    ///
    /// As [`Database::set`], stopping at the first failure.
    pub fn merge_from<I, K, V>(&mut self, pairs: I) -> DbmResult<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        self.lifecycle.require_mutable()?;
        for (key, value) in pairs {
            self.set(key, value)?;
        }
        Ok(self)
    }

    /// Removes and returns the first entry of a traversal.
    ///
    /// # Errors
    ///
    /// [`DbmError::Frozen`], [`DbmError::Closed`], or an engine failure.
    pub fn shift(&mut self) -> DbmResult<Option<Pair>> {
        let handle = self.lifecycle.require_mutable()?;
        let Some(key) = handle.first_key()? else {
            return Ok(None);
        };
        let value = handle.fetch(&key)?.unwrap_or_default();
        handle.delete(&key)?;
        Ok(Some((key, value)))
    }

    // ------------------------------------------------------------------
    // Read-only transforms
    // ------------------------------------------------------------------

    /// Collects every pair.
    ///
    /// # Errors
    ///
    /// The first traversal failure.
    pub fn to_pairs(&self) -> DbmResult<Vec<Pair>> {
        accumulate(self.iter()?, Vec::new(), |mut pairs, pair| {
            pairs.push(pair);
            ControlFlow::Continue(pairs)
        })
    }

    /// Collects every pair into a map.
    ///
    /// # Errors
    ///
    /// The first traversal failure.
    pub fn to_map(&self) -> DbmResult<HashMap<Vec<u8>, Vec<u8>>> {
        accumulate(self.iter()?, HashMap::new(), |mut map, (key, value)| {
            map.insert(key, value);
            ControlFlow::Continue(map)
        })
    }

    /// Collects every key.
    ///
    /// # Errors
    ///
    /// The first traversal failure.
    pub fn keys(&self) -> DbmResult<Vec<Vec<u8>>> {
        accumulate(self.iter_keys()?, Vec::new(), |mut keys, key| {
            keys.push(key);
            ControlFlow::Continue(keys)
        })
    }

    /// Collects every value.
    ///
    /// # Errors
    ///
    /// The first traversal failure.
    pub fn values(&self) -> DbmResult<Vec<Vec<u8>>> {
        accumulate(self.iter_values()?, Vec::new(), |mut values, value| {
            values.push(value);
            ControlFlow::Continue(values)
        })
    }

    /// Builds a value-to-key map.
    ///
    /// When several keys share a value, the one traversed last wins.
    ///
    /// # Errors
    ///
    /// The first traversal failure.
    pub fn invert(&self) -> DbmResult<HashMap<Vec<u8>, Vec<u8>>> {
        accumulate(self.iter()?, HashMap::new(), |mut map, (key, value)| {
            map.insert(value, key);
            ControlFlow::Continue(map)
        })
    }

    /// Returns the first traversed key whose value equals `value`.
    ///
    /// # Errors
    ///
    /// The first traversal failure.
    pub fn key_for_value(&self, value: impl AsRef<[u8]>) -> DbmResult<Option<Vec<u8>>> {
        let value = value.as_ref();
        accumulate(self.iter()?, None, |_, (key, candidate)| {
            if candidate == value {
                ControlFlow::Break(Some(key))
            } else {
                ControlFlow::Continue(None)
            }
        })
    }

    /// Returns true if some key maps to `value`.
    ///
    /// # Errors
    ///
    /// The first traversal failure.
    pub fn contains_value(&self, value: impl AsRef<[u8]>) -> DbmResult<bool> {
        Ok(self.key_for_value(value)?.is_some())
    }

    /// Collects the pairs for which `predicate` returns false.
    ///
    /// # Errors
    ///
    /// The first traversal failure.
    pub fn reject<F>(&self, mut predicate: F) -> DbmResult<HashMap<Vec<u8>, Vec<u8>>>
    where
        F: FnMut(&[u8], &[u8]) -> bool,
    {
        accumulate(self.iter()?, HashMap::new(), |mut kept, (key, value)| {
            if !predicate(&key, &value) {
                kept.insert(key, value);
            }
            ControlFlow::Continue(kept)
        })
    }

    /// Collects the pairs for which `predicate` returns true.
    ///
    /// # Errors
    ///
    /// The first traversal failure.
    pub fn select<F>(&self, mut predicate: F) -> DbmResult<Vec<Pair>>
    where
        F: FnMut(&[u8], &[u8]) -> bool,
    {
        accumulate(self.iter()?, Vec::new(), |mut chosen, (key, value)| {
            if predicate(&key, &value) {
                chosen.push((key, value));
            }
            ControlFlow::Continue(chosen)
        })
    }

    /// Looks up each of `keys`, in order.
    ///
    /// # Errors
    ///
    /// [`DbmError::Closed`], or a fatal engine failure.
    pub fn values_at<I, K>(&self, keys: I) -> DbmResult<Vec<Option<Vec<u8>>>>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        keys.into_iter().map(|key| self.get(key)).collect()
    }

    // ------------------------------------------------------------------
    // Engine passthroughs
    // ------------------------------------------------------------------

    /// Sets how many fetched values the engine caches.
    ///
    /// # Errors
    ///
    /// [`DbmError::Closed`], or [`DbmError::Store`] for a size of zero.
    pub fn set_cache_size(&mut self, size: usize) -> DbmResult<&mut Self> {
        self.set_option(EngineOption::CacheSize(size))
    }

    /// Turns fast mode on or off. Fast mode is sync mode inverted.
    ///
    /// # Errors
    ///
    /// [`DbmError::Closed`].
    pub fn set_fast_mode(&mut self, fast: bool) -> DbmResult<&mut Self> {
        self.set_option(EngineOption::SyncMode(!fast))
    }

    /// Turns syncing after every write on or off.
    ///
    /// # Errors
    ///
    /// [`DbmError::Closed`].
    pub fn set_sync_mode(&mut self, sync: bool) -> DbmResult<&mut Self> {
        self.set_option(EngineOption::SyncMode(sync))
    }

    fn set_option(&mut self, option: EngineOption) -> DbmResult<&mut Self> {
        self.lifecycle.require_open_mut()?.set_option(option)?;
        Ok(self)
    }

    /// Compacts the database file.
    ///
    /// # Errors
    ///
    /// [`DbmError::Frozen`], [`DbmError::Closed`], or an engine failure.
    pub fn reorganize(&mut self) -> DbmResult<&mut Self> {
        self.lifecycle.require_mutable()?.reorganize()?;
        Ok(self)
    }

    /// Flushes pending writes to disk.
    ///
    /// # Errors
    ///
    /// [`DbmError::Frozen`], [`DbmError::Closed`], or an engine failure.
    pub fn sync(&mut self) -> DbmResult<&mut Self> {
        self.lifecycle.require_mutable()?.sync()?;
        Ok(self)
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("closed", &self.is_closed())
            .field("frozen", &self.is_frozen())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn db_with(pairs: &[(&str, &str)]) -> Database {
        let mut db = Database::open_in_memory().unwrap();
        db.merge_from(pairs.iter().copied()).unwrap();
        db
    }

    fn sorted(map: HashMap<Vec<u8>, Vec<u8>>) -> BTreeMap<Vec<u8>, Vec<u8>> {
        map.into_iter().collect()
    }

    #[test]
    fn set_get_and_contains() {
        let mut db = Database::open_in_memory().unwrap();
        db.set(b"a\0b", b"\0\0").unwrap().set("plain", "text").unwrap();

        assert_eq!(db.get(b"a\0b").unwrap(), Some(b"\0\0".to_vec()));
        assert!(db.contains_key("plain").unwrap());
        assert!(!db.contains_key("a").unwrap());
        assert_eq!(db.get("missing").unwrap(), None);
    }

    #[test]
    fn delete_absent_key_is_not_an_error() {
        let mut db = db_with(&[("a", "1")]);
        assert_eq!(db.delete("missing").unwrap(), None);
        assert_eq!(
            db.delete_or_else("missing", |key| [b"no ".as_slice(), key].concat()).unwrap(),
            b"no missing".to_vec()
        );
        assert_eq!(db.delete("a").unwrap(), Some(b"1".to_vec()));
        assert!(db.is_empty().unwrap());
    }

    #[test]
    fn fetch_fallbacks() {
        let db = db_with(&[("a", "1")]);
        assert_eq!(db.fetch("a").unwrap(), b"1".to_vec());
        assert_eq!(db.fetch("b").unwrap_err(), DbmError::KeyNotFound);
        assert_eq!(db.fetch_or("b", "dflt").unwrap(), b"dflt".to_vec());
        assert_eq!(db.fetch_or_else("b", |key| key.to_vec()).unwrap(), b"b".to_vec());
    }

    #[test]
    fn first_and_next_key_cover_each_key_once() {
        let db = db_with(&[("b", "2"), ("a", "1"), ("c", "3")]);

        let mut walked = Vec::new();
        let mut cursor = db.first_key().unwrap();
        while let Some(key) = cursor {
            cursor = db.next_key(&key).unwrap();
            walked.push(key);
        }
        walked.sort();
        assert_eq!(walked, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn first_key_of_empty_or_closed_database() {
        let mut db = Database::open_in_memory().unwrap();
        assert_eq!(db.first_key().unwrap(), None);

        db.close().unwrap();
        assert_eq!(db.first_key().unwrap_err(), DbmError::Closed);
        assert_eq!(db.next_key("a").unwrap_err(), DbmError::Closed);
    }

    #[test]
    fn shift_drains_entries() {
        let mut db = db_with(&[("a", "1"), ("b", "2")]);
        assert_eq!(db.len().unwrap(), 2);

        let mut seen = BTreeMap::new();
        while let Some((key, value)) = db.shift().unwrap() {
            seen.insert(key, value);
        }
        assert_eq!(seen.len(), 2);
        assert_eq!(db.shift().unwrap(), None);
    }

    #[test]
    fn delete_where_removes_matches() {
        let mut db = db_with(&[("a", "1"), ("b", "2"), ("c", "3")]);
        db.delete_where(|_, value| value[0] % 2 == 0).unwrap();

        let expected: BTreeMap<_, _> = [(b"a".to_vec(), b"1".to_vec()), (b"c".to_vec(), b"3".to_vec())]
            .into_iter()
            .collect();
        assert_eq!(sorted(db.to_map().unwrap()), expected);
    }

    #[test]
    fn invert_and_lookup_by_value() {
        let db = db_with(&[("a", "1"), ("b", "2")]);
        let inverted = sorted(db.invert().unwrap());
        assert_eq!(inverted.get(b"1".as_slice()), Some(&b"a".to_vec()));
        assert_eq!(inverted.get(b"2".as_slice()), Some(&b"b".to_vec()));

        assert_eq!(db.key_for_value("2").unwrap(), Some(b"b".to_vec()));
        assert!(db.contains_value("1").unwrap());
        assert!(!db.contains_value("3").unwrap());
    }

    #[test]
    fn invert_with_shared_value_keeps_one_key() {
        let db = db_with(&[("a", "1"), ("b", "1")]);
        let inverted = db.invert().unwrap();
        assert_eq!(inverted.len(), 1);
        let winner = &inverted[b"1".as_slice()];
        assert!(winner == b"a" || winner == b"b");
    }

    #[test]
    fn select_reject_and_values_at() {
        let db = db_with(&[("a", "1"), ("b", "2"), ("c", "3")]);

        let selected = db.select(|key, _| key != b"b").unwrap();
        assert_eq!(selected.len(), 2);

        let rejected = db.reject(|key, _| key != b"b").unwrap();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[b"b".as_slice()], b"2".to_vec());

        assert_eq!(
            db.values_at(["c", "x", "a"]).unwrap(),
            vec![Some(b"3".to_vec()), None, Some(b"1".to_vec())]
        );
    }

    #[test]
    fn pairs_clear_and_merge_restore_mapping() {
        let mut db = db_with(&[("a", "1"), ("b", "2")]);
        let before = sorted(db.to_map().unwrap());
        let pairs = db.to_pairs().unwrap();

        db.clear().unwrap();
        assert!(db.is_empty().unwrap());
        db.clear().unwrap();

        db.merge_from(pairs).unwrap();
        assert_eq!(sorted(db.to_map().unwrap()), before);

        db.replace_all([("z", "26")]).unwrap();
        assert_eq!(db.keys().unwrap(), vec![b"z".to_vec()]);
        assert_eq!(db.values().unwrap(), vec![b"26".to_vec()]);
    }

    #[test]
    fn for_each_visits_everything() {
        let db = db_with(&[("a", "1"), ("b", "2")]);
        let mut keys = 0;
        let mut values = 0;
        let mut pairs = 0;
        db.for_each_key(|_| keys += 1)
            .unwrap()
            .for_each_value(|_| values += 1)
            .unwrap()
            .for_each_pair(|_, _| pairs += 1)
            .unwrap();
        assert_eq!((keys, values, pairs), (2, 2, 2));
    }

    #[test]
    fn frozen_database_refuses_changes() {
        let mut db = db_with(&[("a", "1")]);
        db.freeze();

        assert_eq!(db.set("a", "2").unwrap_err(), DbmError::Frozen);
        assert_eq!(db.delete("a").unwrap_err(), DbmError::Frozen);
        assert_eq!(db.clear().unwrap_err(), DbmError::Frozen);
        assert_eq!(db.shift().unwrap_err(), DbmError::Frozen);
        assert_eq!(db.get("a").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn closed_database_refuses_everything() {
        let mut db = db_with(&[("a", "1")]);
        db.close().unwrap();
        assert!(db.is_closed());

        assert_eq!(db.close().unwrap_err(), DbmError::Closed);
        assert_eq!(db.get("a").unwrap_err(), DbmError::Closed);
        assert_eq!(db.set("a", "1").unwrap_err(), DbmError::Closed);
        assert!(db.iter().is_err());
        assert_eq!(db.len().unwrap_err(), DbmError::Closed);
    }

    #[test]
    fn options_pass_through() {
        let mut db = Database::open_in_memory().unwrap();
        db.set_cache_size(10)
            .unwrap()
            .set_fast_mode(false)
            .unwrap()
            .set_sync_mode(false)
            .unwrap();

        let err = db.set_cache_size(0).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::OptIllegal));

        db.set("k", "v").unwrap().reorganize().unwrap().sync().unwrap();
        assert_eq!(db.get("k").unwrap(), Some(b"v".to_vec()));
    }
}
