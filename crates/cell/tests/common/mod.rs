//! Shared helpers for cell integration tests

use cellar::{ByteIo, FsIo};
use parking_lot::Mutex;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::sleep;
use std::time::{Duration, Instant};

/// A completed write as seen by the filesystem
#[derive(Debug, Clone)]
pub struct Write {
    pub at: Instant,
    pub bytes: Vec<u8>,
}

impl Write {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// `FsIo` that records every write and can be told to fail them
#[derive(Debug, Default)]
pub struct RecordingIo {
    writes: Mutex<Vec<Write>>,
    reads: AtomicUsize,
    failed_writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl RecordingIo {
    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().len()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn failed_write_count(&self) -> usize {
        self.failed_writes.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl ByteIo for RecordingIo {
    fn write_all(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            self.failed_writes.fetch_add(1, Ordering::SeqCst);
            return Err(io::Error::new(io::ErrorKind::Other, "injected write failure"));
        }

        FsIo.write_all(path, bytes)?;
        self.writes.lock().push(Write {
            at: Instant::now(),
            bytes: bytes.to_vec(),
        });
        Ok(())
    }

    fn read_all(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        FsIo.read_all(path)
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(5));
    }
}

/// Sleep until `start + offset`
pub fn sleep_until(start: Instant, offset: Duration) {
    let target = start + offset;
    let now = Instant::now();
    if target > now {
        sleep(target - now);
    }
}
