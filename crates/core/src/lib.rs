//! Cellar Core - typed values mirrored to files
//!
//! This crate provides the storage layer underneath a cell:
//! - Codecs turning a value into bytes and back (JSON, bincode)
//! - Byte I/O against the filesystem (plain and atomic replace)
//! - Resolution of logical file names into platform directories
//! - `SerializedStore`, which ties a codec and an I/O primitive together

pub mod codec;
pub mod error;
pub mod io;
pub mod paths;
pub mod store;

// Re-export main types for convenience
pub use codec::{BincodeCodec, Codec, JsonCodec};
pub use error::{DecodeError, EncodeError, PathError, StorageError};
pub use io::{AtomicFsIo, ByteIo, FsIo};
pub use paths::{Directory, PathResolver, PlatformDirs, RootDir};
pub use store::SerializedStore;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StorageError>;
