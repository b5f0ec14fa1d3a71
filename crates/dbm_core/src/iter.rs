//! Cursor-driven traversal.
//!
//! Traversal is pull-based: each `next` asks the engine for the key after
//! the last one returned, so nothing is snapshotted and dropping an iterator
//! is all it takes to stop early.

use crate::error::DbmResult;
use dbm_engine::StoreHandle;
use std::iter::FusedIterator;
use std::ops::ControlFlow;

#[derive(Debug, Clone)]
enum Cursor {
    Start,
    At(Vec<u8>),
    Done,
}

/// Iterator over keys.
#[derive(Debug)]
pub struct Keys<'a> {
    handle: &'a dyn StoreHandle,
    cursor: Cursor,
}

impl<'a> Keys<'a> {
    pub(crate) fn new(handle: &'a dyn StoreHandle) -> Self {
        Self {
            handle,
            cursor: Cursor::Start,
        }
    }
}

impl Iterator for Keys<'_> {
    type Item = DbmResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let step = match &self.cursor {
            Cursor::Start => self.handle.first_key(),
            Cursor::At(key) => self.handle.next_key(key),
            Cursor::Done => return None,
        };

        match step {
            Ok(Some(key)) => {
                self.cursor = Cursor::At(key.clone());
                Some(Ok(key))
            }
            Ok(None) => {
                self.cursor = Cursor::Done;
                None
            }
            Err(err) => {
                self.cursor = Cursor::Done;
                Some(Err(err.into()))
            }
        }
    }
}

impl FusedIterator for Keys<'_> {}

/// Iterator over `(key, value)` pairs.
#[derive(Debug)]
pub struct Iter<'a> {
    keys: Keys<'a>,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(handle: &'a dyn StoreHandle) -> Self {
        Self {
            keys: Keys::new(handle),
        }
    }
}

impl Iterator for Iter<'_> {
    type Item = DbmResult<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let key = match self.keys.next()? {
                Ok(key) => key,
                Err(err) => return Some(Err(err)),
            };
            match self.keys.handle.fetch(&key) {
                Ok(Some(value)) => return Some(Ok((key, value))),
                // Removed behind our back by another handle; move on.
                Ok(None) => continue,
                Err(err) => {
                    self.keys.cursor = Cursor::Done;
                    return Some(Err(err.into()));
                }
            }
        }
    }
}

impl FusedIterator for Iter<'_> {}

/// Iterator over values.
#[derive(Debug)]
pub struct Values<'a> {
    inner: Iter<'a>,
}

impl<'a> Values<'a> {
    pub(crate) fn new(handle: &'a dyn StoreHandle) -> Self {
        Self {
            inner: Iter::new(handle),
        }
    }
}

impl Iterator for Values<'_> {
    type Item = DbmResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|item| item.map(|(_, value)| value))
    }
}

impl FusedIterator for Values<'_> {}

/// Folds a fallible traversal into a single value.
///
/// `step` returns `Continue` to keep going or `Break` to stop early with a
/// final value. The first traversal error ends the fold.
pub(crate) fn accumulate<T, A, I, F>(items: I, init: A, mut step: F) -> DbmResult<A>
where
    I: IntoIterator<Item = DbmResult<T>>,
    F: FnMut(A, T) -> ControlFlow<A, A>,
{
    let mut acc = init;
    for item in items {
        match step(acc, item?) {
            ControlFlow::Continue(next) => acc = next,
            ControlFlow::Break(done) => return Ok(done),
        }
    }
    Ok(acc)
}
