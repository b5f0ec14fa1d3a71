//! Test fixtures and database helpers.
//!
//! Provides convenience functions for setting up test databases
//! and common test scenarios.

use dbm_core::{Config, Database};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// File name used for file-backed test databases.
pub const TEST_DB_NAME: &str = "test.db";

/// A test database with automatic cleanup.
pub struct TestDatabase {
    /// The database instance.
    pub db: Database,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestDatabase {
    /// Creates a new in-memory test database.
    pub fn memory() -> Self {
        Self {
            db: Database::open_in_memory().expect("Failed to open in-memory database"),
            temp_dir: None,
        }
    }

    /// Creates a new file-based test database in a fresh temporary directory.
    pub fn file() -> Self {
        Self::file_with_config(Config::default())
    }

    /// Creates a file-based test database opened with `config`.
    pub fn file_with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join(TEST_DB_NAME);
        let db = Database::open_with_config(&path, config)
            .expect("Failed to open file database")
            .expect("Config did not allow the database to be created");

        Self {
            db,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the database path if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self.temp_dir.as_ref().map(|d| d.path().join(TEST_DB_NAME))
    }

    /// Closes the file database and opens the same file again with `config`.
    ///
    /// Returns whatever the open returned; the temporary directory stays
    /// alive with `self`.
    pub fn reopen(&mut self, config: Config) -> Option<Database> {
        let path = self.path().expect("Only file databases can be reopened");
        if !self.db.is_closed() {
            self.db.close().expect("Failed to close database");
        }
        Database::open_with_config(path, config).expect("Failed to reopen database")
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

impl std::ops::DerefMut for TestDatabase {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.db
    }
}

/// Returns a fresh temporary directory and a database path inside it.
///
/// Nothing is created at the path.
pub fn temp_db_path() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join(TEST_DB_NAME);
    (dir, path)
}

/// Runs a test with a temporary in-memory database.
///
/// # Example
///
/// ```rust
/// use dbm_testkit::with_temp_db;
///
/// with_temp_db(|db| {
///     db.set("a", "1").unwrap();
///     assert!(db.contains_key("a").unwrap());
/// });
/// ```
pub fn with_temp_db<F, R>(f: F) -> R
where
    F: FnOnce(&mut Database) -> R,
{
    let mut test_db = TestDatabase::memory();
    f(&mut test_db.db)
}

/// Runs a test with a temporary file-based database.
pub fn with_file_db<F, R>(f: F) -> R
where
    F: FnOnce(&mut Database, &Path) -> R,
{
    let mut test_db = TestDatabase::file();
    let path = test_db.path().expect("File database should have a path");
    f(&mut test_db.db, &path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates an in-memory database holding `key-<i>` → `value-<i>`.
    pub fn populated_database(entry_count: usize) -> TestDatabase {
        let mut test_db = TestDatabase::memory();
        test_db
            .db
            .merge_from((0..entry_count).map(|i| (format!("key-{i}"), format!("value-{i}"))))
            .expect("Failed to populate database");
        test_db
    }

    /// Creates an in-memory database with a few entries whose keys and
    /// values contain NUL bytes.
    pub fn binary_database() -> TestDatabase {
        let mut test_db = TestDatabase::memory();
        test_db
            .db
            .merge_from([
                (b"\0".to_vec(), b"nul key".to_vec()),
                (b"nul\0inside".to_vec(), b"\0\0\0".to_vec()),
                (b"plain".to_vec(), Vec::new()),
            ])
            .expect("Failed to populate database");
        test_db
    }
}
