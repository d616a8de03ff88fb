//! Construction of cells
//!
//! Every way of making a cell ends here. The builder fixes the backing path,
//! policy, codec, byte I/O and fault handler; `initial` and `or_default` pick
//! where the starting value comes from.

use crate::cell::DebouncedCell;
use crate::fault::{abort_on_fault, FaultAction, FaultHandler, FlushFault};
use crate::policy::UpdatePolicy;
use cellar_core::{
    AtomicFsIo, ByteIo, Codec, Directory, JsonCodec, PathError, PathResolver, SerializedStore,
    StorageError,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Builder for `DebouncedCell`
///
/// Defaults: `UpdatePolicy::default()` (2s debounce), JSON, atomic writes,
/// abort on a failed automatic flush.
pub struct CellBuilder<C = JsonCodec, I = AtomicFsIo> {
    path: PathBuf,
    policy: UpdatePolicy,
    codec: C,
    io: I,
    on_fault: FaultHandler,
}

impl CellBuilder {
    /// Cell backed by an explicit file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            policy: UpdatePolicy::default(),
            codec: JsonCodec::default(),
            io: AtomicFsIo,
            on_fault: abort_on_fault(),
        }
    }

    /// Cell backed by `name` inside a storage directory
    ///
    /// A name that cannot be resolved yields no builder at all: a cell without
    /// a valid location could not keep its contract.
    pub fn resolve(
        name: &str,
        directory: Directory,
        resolver: &impl PathResolver,
    ) -> Result<Self, PathError> {
        let path = resolver.resolve(name, directory)?;
        debug!(name, %directory, path = %path.display(), "resolved cell path");
        Ok(Self::new(path))
    }
}

impl<C, I> CellBuilder<C, I> {
    pub fn policy(mut self, policy: UpdatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use a different serialization format
    pub fn codec<C2>(self, codec: C2) -> CellBuilder<C2, I> {
        CellBuilder {
            path: self.path,
            policy: self.policy,
            codec,
            io: self.io,
            on_fault: self.on_fault,
        }
    }

    /// Use a different filesystem primitive
    pub fn io<I2>(self, io: I2) -> CellBuilder<C, I2> {
        CellBuilder {
            path: self.path,
            policy: self.policy,
            codec: self.codec,
            io,
            on_fault: self.on_fault,
        }
    }

    /// Decide what happens when a background or disposal flush fails
    pub fn on_fault(
        mut self,
        handler: impl Fn(&FlushFault<'_>) -> FaultAction + Send + Sync + 'static,
    ) -> Self {
        self.on_fault = Arc::new(handler);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start from `value`; whatever is stored is not read
    pub fn initial<T>(self, value: T) -> DebouncedCell<T, C, I>
    where
        T: Send + 'static,
        C: Codec<T> + Send + Sync + 'static,
        I: ByteIo + Send + Sync + 'static,
    {
        let store = SerializedStore::new(self.codec, self.io);
        DebouncedCell::from_parts(value, self.path, self.policy, store, self.on_fault)
    }

    /// Start from the stored value, falling back to `default`
    ///
    /// A missing or undecodable file is not an error here.
    pub fn or_default<T>(self, default: T) -> DebouncedCell<T, C, I>
    where
        T: Send + 'static,
        C: Codec<T> + Send + Sync + 'static,
        I: ByteIo + Send + Sync + 'static,
    {
        let store = SerializedStore::new(self.codec, self.io);

        let value = match store.load(&self.path) {
            Ok(value) => {
                debug!(path = %self.path.display(), "loaded stored value");
                value
            }
            Err(StorageError::NotFound(_)) => {
                debug!(path = %self.path.display(), "nothing stored yet, using default");
                default
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "stored value unusable, using default");
                default
            }
        };

        DebouncedCell::from_parts(value, self.path, self.policy, store, self.on_fault)
    }
}
