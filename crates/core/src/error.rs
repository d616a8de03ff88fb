//! Error types for cellar storage
//!
//! `StorageError` is what `save`/`load` return. The codec and path errors are
//! kept separate so the seam that failed stays visible to callers.

use crate::paths::Directory;
use std::path::PathBuf;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The codec refused to serialize a value
#[derive(Debug, Error)]
#[error("failed to encode value: {source}")]
pub struct EncodeError {
    #[source]
    source: BoxError,
}

impl EncodeError {
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Stored bytes could not be turned back into a value
#[derive(Debug, Error)]
#[error("failed to decode value: {source}")]
pub struct DecodeError {
    #[source]
    source: BoxError,
}

impl DecodeError {
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// A logical name could not be mapped to a file path
#[derive(Debug, Error)]
pub enum PathError {
    #[error("invalid file name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("no {0} directory available on this platform")]
    Unavailable(Directory),
}

/// Failure of a `SerializedStore` save or load
#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("no stored value at {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// True when the backing file simply does not exist yet
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}
