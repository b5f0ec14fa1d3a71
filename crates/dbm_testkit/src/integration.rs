//! Model-checking harness.
//!
//! Applies the same operations to a [`Database`] and to a plain
//! `BTreeMap`, then checks that both agree.

use crate::generators::Op;
use dbm_core::Database;
use std::collections::BTreeMap;

/// A database paired with the map it is expected to match.
pub struct ModelHarness {
    /// The database instance.
    pub db: Database,
    /// What the database should contain.
    model: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl ModelHarness {
    /// Creates a new harness over an in-memory database.
    pub fn new() -> Self {
        Self::with_database(Database::open_in_memory().expect("Failed to open database"))
    }

    /// Creates a harness over an existing, empty database.
    pub fn with_database(db: Database) -> Self {
        assert!(
            db.is_empty().expect("Failed to count entries"),
            "Harness database must start empty"
        );
        Self {
            db,
            model: BTreeMap::new(),
        }
    }

    /// Applies one operation to both sides.
    pub fn apply(&mut self, op: &Op) {
        match op {
            Op::Set(key, value) => {
                self.db.set(key, value).expect("Failed to set");
                self.model.insert(key.clone(), value.clone());
            }
            Op::Delete(key) => {
                let removed = self.db.delete(key).expect("Failed to delete");
                assert_eq!(removed, self.model.remove(key), "Delete result mismatch");
            }
            Op::Shift => match self.db.shift().expect("Failed to shift") {
                Some((key, value)) => {
                    assert_eq!(
                        self.model.remove(&key),
                        Some(value),
                        "Shifted pair not in model"
                    );
                }
                None => assert!(self.model.is_empty(), "Shift on non-empty store"),
            },
            Op::DeleteWhere(first) => {
                let matches = |value: &[u8]| value.first() == Some(first);
                self.db
                    .delete_where(|_, value| matches(value))
                    .expect("Failed to delete_where");
                self.model.retain(|_, value| !matches(value));
            }
            Op::Merge(pairs) => {
                self.db.merge_from(pairs.iter().cloned()).expect("Failed to merge");
                self.model.extend(pairs.iter().cloned());
            }
            Op::ReplaceAll(pairs) => {
                self.db
                    .replace_all(pairs.iter().cloned())
                    .expect("Failed to replace");
                self.model.clear();
                self.model.extend(pairs.iter().cloned());
            }
            Op::Clear => {
                self.db.clear().expect("Failed to clear");
                self.model.clear();
            }
        }
    }

    /// Applies a sequence of operations, verifying after each.
    pub fn run(&mut self, ops: &[Op]) {
        for op in ops {
            self.apply(op);
            self.verify();
        }
    }

    /// Checks that the database holds exactly the model's entries.
    pub fn verify(&self) {
        let actual: BTreeMap<_, _> = self
            .db
            .to_pairs()
            .expect("Failed to read pairs")
            .into_iter()
            .collect();
        assert_eq!(actual, self.model, "Database diverged from model");
        assert_eq!(self.db.len().expect("Failed to count"), self.model.len());
    }

    /// Returns the expected contents.
    pub fn model(&self) -> &BTreeMap<Vec<u8>, Vec<u8>> {
        &self.model
    }
}

impl Default for ModelHarness {
    fn default() -> Self {
        Self::new()
    }
}
