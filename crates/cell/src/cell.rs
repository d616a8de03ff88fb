//! The debounced cell: an in-memory value mirrored to a file
//!
//! All state a flush depends on (the value, the unsaved flag and the armed
//! deadline) sits behind one mutex. The timer thread only decides to flush
//! while holding that mutex and keeps holding it for the write, so:
//! - a flush always writes the latest value, never one captured at arm time
//! - re-arming or disarming can never race with a flush already deciding to run
//! - at most one flush per cell is in progress at any instant

use crate::builder::CellBuilder;
use crate::fault::{abort_process, FaultAction, FaultContext, FaultHandler, FlushFault};
use crate::policy::UpdatePolicy;
use cellar_core::{AtomicFsIo, ByteIo, Codec, JsonCodec, SerializedStore, StorageError};
use parking_lot::{Condvar, Mutex, MutexGuard};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace};

/// A value that persists itself according to an `UpdatePolicy`
///
/// Reads never touch the disk. Writes go through the policy:
/// - `Immediate`: saved before `set` returns
/// - `Debounced(delay)`: saved by a background timer once no write has
///   happened for `delay`
/// - `Manual`: saved only by `save()`
///
/// Dropping a cell with a debounced write still outstanding saves it
/// synchronously. The cell is `Sync`, so it can be shared through an `Arc`.
pub struct DebouncedCell<T, C = JsonCodec, I = AtomicFsIo>
where
    T: Send + 'static,
    C: Codec<T> + Send + Sync + 'static,
    I: ByteIo + Send + Sync + 'static,
{
    shared: Arc<Shared<T, C, I>>,
    /// Timer thread, `Debounced` only
    timer: Option<JoinHandle<()>>,
    /// Set by `close` so `Drop` does not dispose twice
    disposed: bool,
}

struct Shared<T, C, I> {
    store: SerializedStore<T, C, I>,
    path: PathBuf,
    policy: UpdatePolicy,
    on_fault: FaultHandler,
    state: Mutex<CellState<T>>,
    /// Signalled whenever the armed deadline changes or the cell closes
    wake: Condvar,
}

struct CellState<T> {
    value: T,
    /// Mutated under `Debounced` since the last successful flush
    dirty: bool,
    armed: Option<Armed>,
    /// Bumped on every arm; tags each countdown in the log
    generation: u64,
    closed: bool,
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    generation: u64,
    /// `None` when the delay is too long to represent; only disposal flushes it
    deadline: Option<Instant>,
}

impl<T> DebouncedCell<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    /// Start from `value`, ignoring anything already stored at `path`
    pub fn with_initial(value: T, path: impl Into<PathBuf>, policy: UpdatePolicy) -> Self {
        CellBuilder::new(path).policy(policy).initial(value)
    }

    /// Start from the value stored at `path`, or `default` if it cannot be loaded
    pub fn with_default(default: T, path: impl Into<PathBuf>, policy: UpdatePolicy) -> Self {
        CellBuilder::new(path).policy(policy).or_default(default)
    }
}

impl<T, C, I> DebouncedCell<T, C, I>
where
    T: Send + 'static,
    C: Codec<T> + Send + Sync + 'static,
    I: ByteIo + Send + Sync + 'static,
{
    pub(crate) fn from_parts(
        value: T,
        path: PathBuf,
        policy: UpdatePolicy,
        store: SerializedStore<T, C, I>,
        on_fault: FaultHandler,
    ) -> Self {
        let shared = Arc::new(Shared {
            store,
            path,
            policy,
            on_fault,
            state: Mutex::new(CellState {
                value,
                dirty: false,
                armed: None,
                generation: 0,
                closed: false,
            }),
            wake: Condvar::new(),
        });

        let timer = match policy {
            UpdatePolicy::Debounced(_) => {
                let shared = Arc::clone(&shared);
                let handle = thread::Builder::new()
                    .name("cellar-flush".to_string())
                    .spawn(move || shared.run_timer())
                    .expect("failed to spawn flush timer thread");
                Some(handle)
            }
            UpdatePolicy::Immediate | UpdatePolicy::Manual => None,
        };

        Self {
            shared,
            timer,
            disposed: false,
        }
    }

    /// Current value (cloned)
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.shared.state.lock().value.clone()
    }

    /// Borrow the current value
    ///
    /// The cell is locked while `f` runs; a debounced flush waits for it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.shared.state.lock().value)
    }

    /// Replace the value and apply the update policy
    ///
    /// Only `Immediate` can fail here: the write happens before returning and
    /// its error is handed back. The new value is kept in memory either way,
    /// but it is not marked unsaved, so disposal does not retry the write.
    pub fn set(&self, value: T) -> Result<(), StorageError> {
        let mut state = self.shared.state.lock();
        state.value = value;
        self.shared.mutated(&mut state)
    }

    /// Modify the value in place, then apply the update policy
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, StorageError> {
        let mut state = self.shared.state.lock();
        let result = f(&mut state.value);
        self.shared.mutated(&mut state)?;
        Ok(result)
    }

    /// Write the current value now, whatever the policy
    pub fn save(&self) -> Result<(), StorageError> {
        let mut state = self.shared.state.lock();
        self.shared.flush(&mut state)?;
        if state.armed.take().is_some() {
            trace!(path = %self.shared.path.display(), "saved explicitly, countdown cancelled");
        }
        Ok(())
    }

    /// Replace the value with what is stored on disk
    ///
    /// The loaded value already matches storage, so this never schedules a
    /// write; it also cancels one that was pending for the replaced value.
    /// On failure the in-memory value is left untouched.
    pub fn load(&self) -> Result<(), StorageError> {
        let mut state = self.shared.state.lock();
        state.value = self.shared.store.load(&self.shared.path)?;
        state.dirty = false;
        state.armed = None;

        debug!(path = %self.shared.path.display(), "loaded value from storage");
        Ok(())
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Update policy chosen at construction
    pub fn policy(&self) -> UpdatePolicy {
        self.shared.policy
    }

    /// Whether a mutation is waiting to be written
    pub fn is_dirty(&self) -> bool {
        self.shared.state.lock().dirty
    }

    /// Whether a debounce countdown is running
    pub fn is_armed(&self) -> bool {
        self.shared.state.lock().armed.is_some()
    }

    /// Stop the timer and write any outstanding value
    ///
    /// Same as dropping the cell, except a failed final write is returned
    /// instead of going to the fault handler.
    pub fn close(mut self) -> Result<(), StorageError> {
        self.disposed = true;
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), StorageError> {
        {
            let mut state = self.shared.state.lock();
            state.closed = true;
            state.armed = None;
            self.shared.wake.notify_all();
        }

        if let Some(timer) = self.timer.take() {
            if timer.join().is_err() {
                error!(path = %self.shared.path.display(), "flush timer thread panicked");
            }
        }

        let mut state = self.shared.state.lock();
        if !state.dirty {
            return Ok(());
        }

        self.shared.flush(&mut state)?;
        debug!(path = %self.shared.path.display(), "flushed outstanding value on close");
        Ok(())
    }
}

impl<T, C, I> Drop for DebouncedCell<T, C, I>
where
    T: Send + 'static,
    C: Codec<T> + Send + Sync + 'static,
    I: ByteIo + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        if let Err(err) = self.shutdown() {
            self.shared.dispose_failed(&err);
        }
    }
}

impl<T, C, I> Shared<T, C, I>
where
    C: Codec<T>,
    I: ByteIo,
{
    /// Apply the update policy after the value changed
    fn mutated(&self, state: &mut CellState<T>) -> Result<(), StorageError> {
        match self.policy {
            UpdatePolicy::Immediate => self.store.save(&state.value, &self.path),
            UpdatePolicy::Debounced(delay) => {
                state.dirty = true;
                self.arm(state, delay);
                Ok(())
            }
            UpdatePolicy::Manual => Ok(()),
        }
    }

    /// Replace any running countdown with a fresh one
    fn arm(&self, state: &mut CellState<T>, delay: Duration) {
        state.generation += 1;
        let deadline = Instant::now().checked_add(delay);
        let replaced = state.armed.replace(Armed {
            generation: state.generation,
            deadline,
        });

        trace!(
            path = %self.path.display(),
            generation = state.generation,
            restarted = replaced.is_some(),
            unbounded = deadline.is_none(),
            "armed debounce countdown"
        );
        self.wake.notify_one();
    }

    fn flush(&self, state: &mut CellState<T>) -> Result<(), StorageError> {
        self.store.save(&state.value, &self.path)?;
        state.dirty = false;
        Ok(())
    }

    /// Timer thread body
    ///
    /// Every wake-up re-reads the armed deadline under the lock, so a
    /// countdown replaced or cancelled while this thread slept is never acted on.
    fn run_timer(&self) {
        let mut state = self.state.lock();

        while !state.closed {
            let armed = match state.armed {
                Some(armed) => armed,
                None => {
                    self.wake.wait(&mut state);
                    continue;
                }
            };

            match armed.deadline {
                None => {
                    self.wake.wait(&mut state);
                    continue;
                }
                Some(deadline) if Instant::now() < deadline => {
                    self.wake.wait_until(&mut state, deadline);
                    continue;
                }
                Some(_) => {}
            }

            state.armed = None;
            self.fire(&mut state, armed.generation);
        }
    }

    fn fire(&self, state: &mut MutexGuard<'_, CellState<T>>, generation: u64) {
        let err = match self.flush(state) {
            Ok(()) => {
                debug!(path = %self.path.display(), generation, "debounced flush complete");
                return;
            }
            Err(err) => err,
        };

        error!(
            path = %self.path.display(),
            generation,
            error = %err,
            "debounced flush failed"
        );

        let fault = FlushFault {
            path: &self.path,
            error: &err,
            context: FaultContext::Timer,
        };
        let action = MutexGuard::unlocked(state, || (self.on_fault)(&fault));

        match action {
            FaultAction::Abort => abort_process(&fault),
            FaultAction::Retry => {
                // A write made while unlocked may have re-armed already
                if let UpdatePolicy::Debounced(delay) = self.policy {
                    if state.armed.is_none() && state.dirty && !state.closed {
                        self.arm(state, delay);
                    }
                }
            }
        }
    }

    /// Final flush in `Drop` failed
    fn dispose_failed(&self, err: &StorageError) {
        error!(path = %self.path.display(), error = %err, "disposal flush failed");

        let fault = FlushFault {
            path: &self.path,
            error: err,
            context: FaultContext::Dispose,
        };

        match (self.on_fault)(&fault) {
            FaultAction::Abort => abort_process(&fault),
            FaultAction::Retry => {
                let mut state = self.state.lock();
                if let Err(retry_err) = self.flush(&mut state) {
                    error!(
                        path = %self.path.display(),
                        error = %retry_err,
                        "disposal flush retry failed, unsaved value discarded"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread::sleep;
    use tempfile::TempDir;

    fn read_json(path: &Path) -> Option<String> {
        let bytes = fs::read(path).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    #[test]
    fn test_initial_value_ignores_storage() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("someString.json");
        fs::write(&path, b"\"stored\"").unwrap();

        let cell = DebouncedCell::with_initial("Hello!".to_string(), &path, UpdatePolicy::Manual);
        assert_eq!(cell.get(), "Hello!");
        assert_eq!(cell.path(), path);
        assert!(!cell.is_dirty());
    }

    #[test]
    fn test_immediate_writes_before_returning() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("immediate.json");

        let cell = DebouncedCell::with_initial("Hello!".to_string(), &path, UpdatePolicy::Immediate);
        assert_eq!(read_json(&path), None);

        cell.set("first".to_string()).unwrap();
        assert_eq!(read_json(&path).as_deref(), Some("first"));
        assert!(!cell.is_dirty());

        cell.update(|value| value.push_str(" edit")).unwrap();
        assert_eq!(read_json(&path).as_deref(), Some("first edit"));
    }

    #[test]
    fn test_immediate_failure_is_returned_not_retried() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing-dir").join("value.json");

        // Default handler: a disposal retry would abort the test binary
        let cell = DebouncedCell::with_initial(1u32, &path, UpdatePolicy::Immediate);

        let err = cell.set(2).unwrap_err();
        assert!(matches!(err, StorageError::Write { .. }));
        assert_eq!(cell.get(), 2);
        assert!(!cell.is_dirty());

        // Even once the write could succeed, dropping does not repeat it
        fs::create_dir(temp_dir.path().join("missing-dir")).unwrap();
        drop(cell);
        assert!(!path.exists());
    }

    #[test]
    fn test_immediate_failure_then_success() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("later").join("value.json");

        let cell = DebouncedCell::with_initial(0u32, &path, UpdatePolicy::Immediate);
        assert!(cell.update(|n| *n += 1).is_err());

        fs::create_dir(temp_dir.path().join("later")).unwrap();
        cell.update(|n| *n += 1).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"2");
        assert!(cell.close().is_ok());
    }

    #[test]
    fn test_manual_never_writes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("manual.json");

        let cell = DebouncedCell::with_initial(vec![1, 2, 3], &path, UpdatePolicy::Manual);
        cell.set(vec![4]).unwrap();
        cell.update(|v| v.push(5)).unwrap();
        assert!(!cell.is_dirty());
        assert!(!cell.is_armed());
        drop(cell);

        assert!(!path.exists());
    }

    #[test]
    fn test_explicit_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nccCodableStorageTests_string.json");

        let cell = DebouncedCell::with_initial("hello".to_string(), &path, UpdatePolicy::Manual);
        cell.set("craziness".to_string()).unwrap();
        cell.save().unwrap();

        cell.set("afterSaving".to_string()).unwrap();
        cell.load().unwrap();
        assert_eq!(cell.get(), "craziness");
    }

    #[test]
    fn test_failed_load_keeps_value() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.json");

        let cell = DebouncedCell::with_initial(7i64, &path, UpdatePolicy::Manual);
        let err = cell.load().unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(cell.get(), 7);

        fs::write(&path, b"not json").unwrap();
        assert!(matches!(cell.load(), Err(StorageError::Decode(_))));
        assert_eq!(cell.get(), 7);
    }

    #[test]
    fn test_debounced_arms_then_flushes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("debounced.json");
        let delay = Duration::from_millis(100);

        let cell = DebouncedCell::with_initial(0u32, &path, UpdatePolicy::Debounced(delay));
        assert!(!cell.is_armed());

        cell.set(42).unwrap();
        assert!(cell.is_armed());
        assert!(cell.is_dirty());
        assert!(!path.exists());

        let deadline = Instant::now() + Duration::from_secs(5);
        while cell.is_dirty() && Instant::now() < deadline {
            sleep(Duration::from_millis(10));
        }

        assert!(!cell.is_armed());
        assert!(!cell.is_dirty());
        assert_eq!(fs::read(&path).unwrap(), b"42");
    }

    #[test]
    fn test_save_cancels_countdown() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("saved.json");

        let cell = DebouncedCell::with_initial(0u8, &path, UpdatePolicy::after_idle(60.0));
        cell.set(9).unwrap();
        assert!(cell.is_armed());

        cell.save().unwrap();
        assert!(!cell.is_armed());
        assert!(!cell.is_dirty());
        assert_eq!(fs::read(&path).unwrap(), b"9");
    }

    #[test]
    fn test_unbounded_delay_waits_for_disposal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("forever.json");

        let cell = DebouncedCell::with_initial(0u8, &path, UpdatePolicy::Debounced(Duration::MAX));
        cell.set(3).unwrap();
        assert!(cell.is_armed());

        sleep(Duration::from_millis(50));
        assert!(!path.exists());

        drop(cell);
        assert_eq!(fs::read(&path).unwrap(), b"3");
    }

    #[test]
    fn test_close_flushes_pending_value() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("close.json");

        let cell = DebouncedCell::with_initial(0u8, &path, UpdatePolicy::after_idle(60.0));
        cell.set(1).unwrap();
        cell.set(2).unwrap();
        cell.close().unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"2");
    }

    #[test]
    fn test_close_reports_failure() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("gone").join("close.json");

        let cell = CellBuilder::new(&path)
            .policy(UpdatePolicy::after_idle(60.0))
            .on_fault(|_| FaultAction::Retry)
            .initial(0u8);
        cell.set(1).unwrap();

        assert!(matches!(cell.close(), Err(StorageError::Write { .. })));
    }

    #[test]
    fn test_shared_between_threads() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("counter.json");

        let cell = Arc::new(DebouncedCell::with_initial(
            0u64,
            &path,
            UpdatePolicy::Debounced(Duration::from_millis(20)),
        ));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let cell = Arc::clone(&cell);
                thread::spawn(move || {
                    for _ in 0..250 {
                        cell.update(|n| *n += 1).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let cell = Arc::try_unwrap(cell).ok().unwrap();
        assert_eq!(cell.get(), 1000);
        cell.close().unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"1000");
    }
}
