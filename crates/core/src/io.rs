//! Filesystem touchpoints
//!
//! Everything a store does to disk goes through `ByteIo`, so tests can count
//! or fail writes without touching the store itself.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

/// Whole-file byte I/O
pub trait ByteIo {
    /// Replace the contents of `path` with `bytes`
    fn write_all(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Read the full contents of `path`
    fn read_all(&self, path: &Path) -> io::Result<Vec<u8>>;
}

impl<I: ByteIo + ?Sized> ByteIo for Arc<I> {
    fn write_all(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        (**self).write_all(path, bytes)
    }

    fn read_all(&self, path: &Path) -> io::Result<Vec<u8>> {
        (**self).read_all(path)
    }
}

/// Plain overwrite in place
///
/// A crash mid-write can leave a truncated file behind.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsIo;

impl ByteIo for FsIo {
    fn write_all(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        fs::write(path, bytes)
    }

    fn read_all(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}

/// Write-to-temp-then-rename
///
/// Writes data to a temporary file next to the target, fsyncs it, then renames
/// it over the target path. Readers see either the old or the new contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicFsIo;

impl ByteIo for AtomicFsIo {
    fn write_all(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        // The temp file must live on the same filesystem for rename to be atomic
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = tempfile::Builder::new()
            .prefix(".cellar-")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;

        sync_dir(dir)
    }

    fn read_all(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}

/// Fsync a directory so a completed rename survives a crash
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
