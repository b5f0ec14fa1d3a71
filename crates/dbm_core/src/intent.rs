//! What the caller asked for when opening a database.

use dbm_engine::{OpenFlags, OpenMode};

/// Packed integer flags in the classic dbm wrapper layout.
///
/// The mode constants carry [`raw::RW_BIT`]; passing one of them selects an
/// explicit mode. The modifier constants can be OR-ed onto either.
///
/// ```rust
/// use dbm_core::{raw, OpenIntent};
/// use dbm_engine::{OpenFlags, OpenMode};
///
/// assert_eq!(
///     OpenIntent::from_raw(raw::READER | raw::NOLOCK),
///     OpenIntent::Explicit { mode: OpenMode::Reader, flags: OpenFlags::NOLOCK },
/// );
/// assert_eq!(OpenIntent::from_raw(raw::SYNC), OpenIntent::Auto { flags: OpenFlags::SYNC });
/// ```
pub mod raw {
    /// Marks the low bits as an explicit mode.
    pub const RW_BIT: i32 = 0x2000_0000;
    /// Explicit read-only mode.
    pub const READER: i32 = RW_BIT;
    /// Explicit read-write mode on an existing database.
    pub const WRITER: i32 = 1 | RW_BIT;
    /// Explicit read-write mode, creating the database if missing.
    pub const WRCREAT: i32 = 2 | RW_BIT;
    /// Explicit read-write mode on a truncated database.
    pub const NEWDB: i32 = 3 | RW_BIT;
    /// Do not sync after each write.
    pub const FAST: i32 = 0x10;
    /// Sync after each write.
    pub const SYNC: i32 = 0x20;
    /// Skip file locking.
    pub const NOLOCK: i32 = 0x40;
}

/// How to open a database, decided once at the call boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenIntent {
    /// Open in exactly this mode; no fallback.
    Explicit {
        /// Access mode.
        mode: OpenMode,
        /// Modifier bits.
        flags: OpenFlags,
    },
    /// Try create, then writer, then reader.
    Auto {
        /// Modifier bits applied to every attempt.
        flags: OpenFlags,
    },
}

impl Default for OpenIntent {
    fn default() -> Self {
        Self::Auto {
            flags: OpenFlags::NONE,
        }
    }
}

impl OpenIntent {
    /// Decodes the packed integer form.
    #[must_use]
    pub const fn from_raw(packed: i32) -> Self {
        let bits = (packed & !raw::RW_BIT) as u32;
        let flags = OpenFlags::from_bits_truncate(bits);

        if packed & raw::RW_BIT != 0 {
            Self::Explicit {
                mode: OpenMode::from_bits(bits),
                flags,
            }
        } else {
            Self::Auto { flags }
        }
    }

    /// Explicit read-only intent.
    #[must_use]
    pub const fn reader() -> Self {
        Self::explicit(OpenMode::Reader)
    }

    /// Explicit writer intent on an existing database.
    #[must_use]
    pub const fn writer() -> Self {
        Self::explicit(OpenMode::Writer)
    }

    /// Explicit create-if-missing intent.
    #[must_use]
    pub const fn create() -> Self {
        Self::explicit(OpenMode::WrCreat)
    }

    /// Explicit intent to start from an empty database.
    #[must_use]
    pub const fn new_database() -> Self {
        Self::explicit(OpenMode::NewDb)
    }

    const fn explicit(mode: OpenMode) -> Self {
        Self::Explicit {
            mode,
            flags: OpenFlags::NONE,
        }
    }

    /// Returns the modifier bits.
    #[must_use]
    pub const fn flags(&self) -> OpenFlags {
        match self {
            Self::Explicit { flags, .. } | Self::Auto { flags } => *flags,
        }
    }

    /// Replaces the modifier bits.
    #[must_use]
    pub const fn with_flags(self, flags: OpenFlags) -> Self {
        match self {
            Self::Explicit { mode, .. } => Self::Explicit { mode, flags },
            Self::Auto { .. } => Self::Auto { flags },
        }
    }
}
