//! Property-based test generators using proptest.
//!
//! Keys and values are arbitrary bytes, NUL included, since the store
//! treats both as opaque byte strings.

use proptest::prelude::*;
use std::collections::BTreeMap;

/// Strategy for generating keys.
///
/// Drawn from a small alphabet so generated operations collide on the same
/// keys often enough to exercise replacement and deletion.
pub fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        4 => prop::collection::vec(prop::sample::select(vec![b'a', b'b', b'c', 0u8]), 1..4),
        1 => prop::collection::vec(any::<u8>(), 0..32),
    ]
}

/// Strategy for generating values (arbitrary bytes, possibly empty).
pub fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..256)
}

/// Strategy for generating a set of entries with distinct keys.
pub fn entries_strategy(max_entries: usize) -> impl Strategy<Value = BTreeMap<Vec<u8>, Vec<u8>>> {
    prop::collection::btree_map(key_strategy(), value_strategy(), 0..=max_entries)
}

/// A single operation applied to both a database and a model map.
#[derive(Debug, Clone)]
pub enum Op {
    /// Store or replace a value.
    Set(Vec<u8>, Vec<u8>),
    /// Delete a key, present or not.
    Delete(Vec<u8>),
    /// Remove whichever entry the store yields first.
    Shift,
    /// Delete every entry whose value starts with the given byte.
    DeleteWhere(u8),
    /// Merge several pairs at once.
    Merge(Vec<(Vec<u8>, Vec<u8>)>),
    /// Replace the whole contents.
    ReplaceAll(Vec<(Vec<u8>, Vec<u8>)>),
    /// Remove everything.
    Clear,
}

/// Strategy for generating a single operation.
pub fn op_strategy() -> impl Strategy<Value = Op> {
    let pairs = || prop::collection::vec((key_strategy(), value_strategy()), 0..6);
    prop_oneof![
        8 => (key_strategy(), value_strategy()).prop_map(|(k, v)| Op::Set(k, v)),
        4 => key_strategy().prop_map(Op::Delete),
        2 => Just(Op::Shift),
        1 => any::<u8>().prop_map(Op::DeleteWhere),
        1 => pairs().prop_map(Op::Merge),
        1 => pairs().prop_map(Op::ReplaceAll),
        1 => Just(Op::Clear),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn ops_strategy(max_ops: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op_strategy(), 0..=max_ops)
}
