//! Thread-wide record of the most recent primitive failure.
//!
//! Engines call [`record`] whenever a primitive fails, so callers that only
//! see a status (or want the text later) can ask what went wrong, the same
//! way C dbm libraries expose an errno and a strerror.

use crate::error::{EngineError, ErrorCode};
use std::cell::RefCell;

thread_local! {
    static LAST_ERROR: RefCell<Option<EngineError>> = const { RefCell::new(None) };
}

/// Stores `err` as the last failure on this thread.
pub fn record(err: &EngineError) {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(err.clone()));
}

/// Forgets the last failure.
pub fn clear() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

/// Returns the last failure recorded on this thread.
#[must_use]
pub fn last_error() -> Option<EngineError> {
    LAST_ERROR.with(|slot| slot.borrow().clone())
}

/// Returns the code of the last failure.
#[must_use]
pub fn last_error_code() -> Option<ErrorCode> {
    LAST_ERROR.with(|slot| slot.borrow().as_ref().map(EngineError::code))
}

/// Returns the message of the last failure, or `"No error"`.
#[must_use]
pub fn last_error_message() -> String {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or_else(|| "No error".to_string(), EngineError::message)
    })
}
