//! Typed load/save of a value against a backing file

use crate::codec::{Codec, JsonCodec};
use crate::error::StorageError;
use crate::io::{AtomicFsIo, ByteIo};
use std::io;
use std::marker::PhantomData;
use std::path::Path;
use tracing::trace;

/// Loads and saves values of type `T` through a codec and a byte I/O primitive
///
/// The store holds no path and no value; it is stateless apart from the two
/// injected pieces, so one store can serve any number of files.
pub struct SerializedStore<T, C = JsonCodec, I = AtomicFsIo> {
    codec: C,
    io: I,
    _value: PhantomData<fn() -> T>,
}

impl<T, C, I> SerializedStore<T, C, I>
where
    C: Codec<T>,
    I: ByteIo,
{
    pub fn new(codec: C, io: I) -> Self {
        Self {
            codec,
            io,
            _value: PhantomData,
        }
    }

    /// Serialize `value` and replace the contents of `path` with it
    pub fn save(&self, value: &T, path: &Path) -> Result<(), StorageError> {
        let bytes = self.codec.encode(value)?;
        self.io
            .write_all(path, &bytes)
            .map_err(|source| StorageError::Write {
                path: path.to_path_buf(),
                source,
            })?;

        trace!(path = %path.display(), bytes = bytes.len(), "saved value");
        Ok(())
    }

    /// Read `path` and decode it
    pub fn load(&self, path: &Path) -> Result<T, StorageError> {
        let bytes = self.io.read_all(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                StorageError::NotFound(path.to_path_buf())
            } else {
                StorageError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let value = self.codec.decode(&bytes)?;
        trace!(path = %path.display(), bytes = bytes.len(), "loaded value");
        Ok(value)
    }

    /// Whether a regular file is present at `path`
    ///
    /// Says nothing about whether its contents decode.
    pub fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn io(&self) -> &I {
        &self.io
    }
}

impl<T, C, I> Default for SerializedStore<T, C, I>
where
    C: Codec<T> + Default,
    I: ByteIo + Default,
{
    fn default() -> Self {
        Self::new(C::default(), I::default())
    }
}

impl<T, C: Clone, I: Clone> Clone for SerializedStore<T, C, I> {
    fn clone(&self) -> Self {
        Self {
            codec: self.codec.clone(),
            io: self.io.clone(),
            _value: PhantomData,
        }
    }
}
