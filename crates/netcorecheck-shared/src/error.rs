//! Error types for netcorecheck.
//!
//! Every variant of [`Error`] is fatal to a probe and maps to exactly one exit
//! code (see [`crate::exit`]). Problems during cleanup are [`CleanupWarning`]s:
//! they are logged and never change the outcome.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Failed to compute runtime config file path: {0}")]
    PathComputation(String),

    #[error("Failed to format runtime config text: {0}")]
    Format(String),

    #[error("Failed to write runtime config file '{}': {source}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("get_hostfxr_path failed: '{status}'")]
    ResolverNotFound { status: i32 },

    #[error("Failed to get exports from hostfxr: {0}")]
    ExportResolution(String),

    #[error("hostfxr_initialize_for_runtime_config failed: '{status}'")]
    Initialize { status: i32 },
}

impl Error {
    pub(crate) fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileWrite {
            path: path.into(),
            source,
        }
    }
}

/// Non-fatal failure while releasing probe resources.
#[derive(Debug, Error)]
pub enum CleanupWarning {
    #[error("hostfxr_close failed: '{status}'")]
    CloseFailed { status: i32 },

    #[error("Failed to unload hostfxr: {0}")]
    UnloadFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
