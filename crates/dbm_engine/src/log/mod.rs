//! Append-only record log shared by the reference engines.
//!
//! ## File Format
//!
//! ```text
//! | header (16) | record | record | ... |
//! record = | len (4) | kind (1) | key_len (4) | prefix_crc (4) | key | value | crc32 (4) |
//! ```
//!
//! Opening a log replays every record into an ordered in-memory index from
//! key to the offset of its latest put. Deletes and overwrites only append,
//! so the file grows until a reorganize rewrites it with live records only.
//!
//! ## Recovery Policy
//!
//! - A record cut short at the end of the file is ignored (a writer trims it).
//!   Only a record whose prefix is missing, or whose checked prefix promises
//!   more bytes than remain, counts as cut short.
//! - A checksum mismatch, in the prefix or the whole record, or inconsistent
//!   framing fails the open and leaves the file untouched.
//! - The same damage found later, while serving a fetch, runs the handle's
//!   fatal handler and returns an error flagged fatal.

mod cache;
mod handle;
mod record;
mod store;

pub use cache::{ValueCache, DEFAULT_CACHE_SIZE};
pub use handle::{LogHandle, Medium};
pub use record::{compute_crc32, FileHeader, LogRecord, RecordKind};
pub use store::{LogStore, MIN_BLOCK_SIZE};
