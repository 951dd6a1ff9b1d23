//! Crate-wide error type.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by collection operations, merging, the generator and the sync helpers.
#[derive(Error, Debug)]
pub enum Error {
    #[error("not mergeable: {0}")]
    NotMergeable(String),

    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("cycle detected involving: {}", .0.join(", "))]
    Cycle(Vec<String>),

    #[error("concurrent value used before init or after result")]
    Uninitialized,

    #[error("concurrent value is already initialized")]
    AlreadyInitialized,

    #[error("status chain stopped before the awaited status appeared")]
    StatusStopped,

    #[error("config error: {0}")]
    Config(String),

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
