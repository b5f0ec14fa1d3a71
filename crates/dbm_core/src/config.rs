//! Database configuration.

use crate::intent::OpenIntent;
use dbm_engine::{logging_fatal_handler, FatalHandler};
use std::fmt;

/// Block size handed to the engine unless configured otherwise.
pub const DEFAULT_BLOCK_SIZE: u32 = 2048;

/// Permission bits for newly created database files.
pub const DEFAULT_FILE_MODE: u32 = 0o666;

/// Configuration for opening a database.
#[derive(Clone)]
pub struct Config {
    /// Permission bits used when the file is created.
    ///
    /// `None` means the caller did not ask for creation: the create attempt
    /// of [`OpenIntent::Auto`] is skipped, and a database that cannot be
    /// opened at all yields `Ok(None)` instead of an error.
    pub file_mode: Option<u32>,

    /// Which modes to try.
    pub intent: OpenIntent,

    /// Block size requested from the engine.
    pub block_size: u32,

    /// Called by the engine on unrecoverable errors.
    pub fatal_handler: FatalHandler,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file_mode: Some(DEFAULT_FILE_MODE),
            intent: OpenIntent::default(),
            block_size: DEFAULT_BLOCK_SIZE,
            fatal_handler: logging_fatal_handler(),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the permission bits for a created file.
    #[must_use]
    pub fn file_mode(mut self, mode: u32) -> Self {
        self.file_mode = Some(mode);
        self
    }

    /// Marks that no file creation was requested.
    #[must_use]
    pub fn no_create(mut self) -> Self {
        self.file_mode = None;
        self
    }

    /// Sets the open intent.
    #[must_use]
    pub fn intent(mut self, intent: OpenIntent) -> Self {
        self.intent = intent;
        self
    }

    /// Sets the open intent from packed integer flags.
    ///
    /// See [`crate::raw`] for the constants.
    #[must_use]
    pub fn raw_flags(self, packed: i32) -> Self {
        self.intent(OpenIntent::from_raw(packed))
    }

    /// Sets the block size requested from the engine.
    #[must_use]
    pub fn block_size(mut self, size: u32) -> Self {
        self.block_size = size;
        self
    }

    /// Sets the handler for unrecoverable engine errors.
    #[must_use]
    pub fn fatal_handler(mut self, handler: FatalHandler) -> Self {
        self.fatal_handler = handler;
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("file_mode", &self.file_mode.map(|mode| format!("{mode:o}")))
            .field("intent", &self.intent)
            .field("block_size", &self.block_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::raw;
    use dbm_engine::{OpenFlags, OpenMode};

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.file_mode, Some(0o666));
        assert_eq!(config.intent, OpenIntent::Auto { flags: OpenFlags::NONE });
        assert_eq!(config.block_size, 2048);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .file_mode(0o600)
            .raw_flags(raw::WRITER | raw::SYNC)
            .block_size(4096);

        assert_eq!(config.file_mode, Some(0o600));
        assert_eq!(
            config.intent,
            OpenIntent::Explicit {
                mode: OpenMode::Writer,
                flags: OpenFlags::SYNC
            }
        );
        assert_eq!(config.block_size, 4096);

        let config = config.no_create();
        assert_eq!(config.file_mode, None);
        assert!(format!("{config:?}").contains("file_mode: None"));
    }
}
