use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for restash operations.
pub type Result<T> = std::result::Result<T, Error>;

/// All fatal failures that can occur while checkpointing.
///
/// Everything here propagates unmodified to the caller. There are no
/// retries and no partial-success states: either the full
/// compute-save-return cycle completes or the call fails before any side
/// effect beyond idempotent directory creation.
#[derive(Error, Debug)]
pub enum Error {
    #[error("i/o failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode or decode a cache artifact: {0}")]
    Codec(#[from] bincode::Error),

    #[error(
        "'{field}' is already configured with a different value; \
         use another reader id if you do want this"
    )]
    Conflict { field: &'static str },

    #[error("no '{field}' is configured for this reader")]
    Unconfigured { field: &'static str },

    #[error("path is invalid or does not exist: {path}")]
    InvalidPath { path: PathBuf },

    #[error("'example_path' cannot be combined with explicit write options")]
    ExampleWithOptions,

    #[error("failed to save by speculation, {0}")]
    Speculation(String),
}

impl Error {
    /// Wrap an i/o error with the path it occurred at.
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
