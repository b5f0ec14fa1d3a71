//! Parameters passed across the primitive binding.

use std::fmt;
use std::ops::BitOr;
use std::path::Path;
use std::sync::Arc;

/// How a handle wants to use the database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpenMode {
    /// Read-only access; the file must already hold a database.
    Reader = 0,
    /// Read-write access to an existing database.
    Writer = 1,
    /// Read-write access, creating the file if it is missing.
    WrCreat = 2,
    /// Read-write access to a brand-new, empty database.
    NewDb = 3,
}

impl OpenMode {
    /// Decodes the two low bits of a raw mode word.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0 => Self::Reader,
            1 => Self::Writer,
            2 => Self::WrCreat,
            _ => Self::NewDb,
        }
    }

    /// Returns true for every mode except [`OpenMode::Reader`].
    #[must_use]
    pub const fn is_writer(self) -> bool {
        !matches!(self, Self::Reader)
    }

    /// Returns true if the mode may create the file.
    #[must_use]
    pub const fn creates(self) -> bool {
        matches!(self, Self::WrCreat | Self::NewDb)
    }
}

/// Modifier bits accepted alongside an [`OpenMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OpenFlags(u32);

impl OpenFlags {
    /// No modifiers.
    pub const NONE: Self = Self(0);
    /// Do not sync after each write.
    pub const FAST: Self = Self(0x10);
    /// Sync after each write.
    pub const SYNC: Self = Self(0x20);
    /// Skip the advisory file lock.
    pub const NOLOCK: Self = Self(0x40);

    const ALL: u32 = 0x10 | 0x20 | 0x40;

    /// Keeps only the modifier bits of `bits`.
    #[must_use]
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::ALL)
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if writes should be synced immediately.
    #[must_use]
    pub const fn syncs_writes(self) -> bool {
        self.contains(Self::SYNC) && !self.contains(Self::FAST)
    }
}

impl BitOr for OpenFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// What `store` does when the key already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorePolicy {
    /// Fail with `CannotReplace`.
    Insert,
    /// Overwrite the existing value.
    Replace,
}

/// Tunables accepted by `set_option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineOption {
    /// Number of fetched values kept in the handle's cache. Zero is illegal.
    CacheSize(usize),
    /// Sync after every write when true.
    SyncMode(bool),
}

/// Callback the engine runs when it hits an unrecoverable condition.
///
/// Passed in at open time and kept by the handle; never stored globally.
pub type FatalHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Returns a handler that reports fatal conditions through `tracing`.
#[must_use]
pub fn logging_fatal_handler() -> FatalHandler {
    Arc::new(|message: &str| tracing::error!(error = %message, "fatal dbm engine error"))
}

/// Everything an engine needs to open one handle.
#[derive(Clone)]
pub struct OpenRequest<'a> {
    /// Database file path.
    pub path: &'a Path,
    /// Preferred block size; engines may round it up.
    pub block_size: u32,
    /// Access mode.
    pub mode: OpenMode,
    /// Modifier bits.
    pub flags: OpenFlags,
    /// Permission bits for a newly created file.
    pub file_mode: u32,
    /// Handler for unrecoverable errors on this handle.
    pub fatal: FatalHandler,
}

impl fmt::Debug for OpenRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRequest")
            .field("path", &self.path)
            .field("block_size", &self.block_size)
            .field("mode", &self.mode)
            .field("flags", &self.flags)
            .field("file_mode", &format_args!("{:o}", self.file_mode))
            .finish_non_exhaustive()
    }
}
