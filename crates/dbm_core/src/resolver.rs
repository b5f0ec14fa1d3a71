//! Open-mode resolution.
//!
//! Turns a [`Config`] into the ordered list of engine opens to try and runs
//! them until one succeeds.

use crate::config::{Config, DEFAULT_FILE_MODE};
use crate::error::{DbmError, DbmResult};
use crate::intent::OpenIntent;
use dbm_engine::{
    last_error, Engine, EngineError, ErrorCode, OpenFlags, OpenMode, OpenRequest, StoreHandle,
};
use std::path::Path;

/// One engine open to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Attempt {
    pub mode: OpenMode,
    pub flags: OpenFlags,
    pub file_mode: u32,
}

/// Lists the opens to try, in order.
///
/// An explicit intent is tried once. An automatic one tries create (unless
/// no file mode was given), then writer, then reader; the last two never
/// create, so they pass a file mode of zero.
pub(crate) fn attempts(config: &Config) -> Vec<Attempt> {
    match config.intent {
        OpenIntent::Explicit { mode, flags } => vec![Attempt {
            mode,
            flags,
            file_mode: config.file_mode.unwrap_or(DEFAULT_FILE_MODE),
        }],
        OpenIntent::Auto { flags } => {
            let create = config.file_mode.map(|file_mode| Attempt {
                mode: OpenMode::WrCreat,
                flags,
                file_mode,
            });
            create
                .into_iter()
                .chain([OpenMode::Writer, OpenMode::Reader].map(|mode| Attempt {
                    mode,
                    flags,
                    file_mode: 0,
                }))
                .collect()
        }
    }
}

/// Opens `path` with the first attempt that succeeds.
///
/// Returns `Ok(None)` when every attempt failed and `config.file_mode` is
/// `None`; callers that asked for no creation get an empty result instead
/// of an error.
///
/// # Errors
///
/// [`DbmError::Open`] carrying the engine's last error when every attempt
/// failed and a file mode was given.
pub(crate) fn resolve(
    engine: &dyn Engine,
    path: &Path,
    config: &Config,
) -> DbmResult<Option<Box<dyn StoreHandle>>> {
    last_error::clear();
    let mut last_failure = None;

    for attempt in attempts(config) {
        let request = OpenRequest {
            path,
            block_size: config.block_size,
            mode: attempt.mode,
            flags: attempt.flags,
            file_mode: attempt.file_mode,
            fatal: config.fatal_handler.clone(),
        };

        match engine.open(&request) {
            Ok(handle) => {
                tracing::debug!(path = %path.display(), mode = ?attempt.mode, "opened database");
                return Ok(Some(handle));
            }
            Err(err) => {
                tracing::debug!(
                    path = %path.display(),
                    mode = ?attempt.mode,
                    error = %err,
                    "open attempt failed"
                );
                last_failure = Some(err);
            }
        }
    }

    if config.file_mode.is_none() {
        tracing::warn!(
            path = %path.display(),
            "no open mode succeeded and no creation was requested; returning no database"
        );
        return Ok(None);
    }

    let err = last_error::last_error()
        .or(last_failure)
        .unwrap_or_else(|| EngineError::new(ErrorCode::FileOpenError));
    Err(DbmError::open(&err))
}
