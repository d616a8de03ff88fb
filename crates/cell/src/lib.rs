//! Durable variables for single-process applications
//!
//! A `DebouncedCell` keeps a value in memory and mirrors it to a file:
//! - Reads never touch the disk
//! - Writes are persisted immediately, after a quiet period, or only on request
//! - Missing or corrupt files fall back to a default at construction
//! - Outstanding writes are flushed when the cell is dropped
//!
//! ```no_run
//! use cellar::{DebouncedCell, UpdatePolicy};
//!
//! let cell = DebouncedCell::with_default(Vec::<String>::new(), "myDataArray.json", UpdatePolicy::after_idle(5.0));
//! cell.update(|list| list.push("hello".to_string())).unwrap();
//! ```

pub mod builder;
pub mod cell;
pub mod config;
pub mod fault;
pub mod policy;

// Re-exports
pub use builder::CellBuilder;
pub use cell::DebouncedCell;
pub use config::{CellConfig, UpdateConfig};
pub use fault::{FaultAction, FaultContext, FaultHandler, FlushFault};
pub use policy::UpdatePolicy;

pub use cellar_core::{
    AtomicFsIo, BincodeCodec, ByteIo, Codec, DecodeError, Directory, EncodeError, FsIo, JsonCodec,
    PathError, PathResolver, PlatformDirs, RootDir, SerializedStore, StorageError,
};
