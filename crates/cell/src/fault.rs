//! Handling of automatic flushes that fail with nobody waiting on them
//!
//! A debounced flush runs on the timer thread and a disposal flush runs in
//! `Drop`; neither can hand an error back to a caller. The cell logs the
//! failure and asks its fault handler what to do. The unsaved value is never
//! dropped without that happening.

use cellar_core::StorageError;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::error;

/// Where the failed flush was attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultContext {
    /// The debounce countdown elapsed
    Timer,
    /// The cell was being dropped with an unsaved value
    Dispose,
}

impl fmt::Display for FaultContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultContext::Timer => f.write_str("debounced flush"),
            FaultContext::Dispose => f.write_str("disposal flush"),
        }
    }
}

/// A failed automatic flush
#[derive(Debug)]
pub struct FlushFault<'a> {
    pub path: &'a Path,
    pub error: &'a StorageError,
    pub context: FaultContext,
}

/// What the cell does after a failed automatic flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultAction {
    /// Abort the process
    Abort,
    /// Keep the value marked unsaved and try again: after the debounce delay
    /// on the timer thread, or once more straight away during disposal
    Retry,
}

/// Callback consulted on every failed automatic flush
///
/// Runs without the cell's lock held.
pub type FaultHandler = Arc<dyn Fn(&FlushFault<'_>) -> FaultAction + Send + Sync>;

/// Default handler: treat a lost write as unrecoverable
pub fn abort_on_fault() -> FaultHandler {
    Arc::new(|_: &FlushFault<'_>| FaultAction::Abort)
}

/// Handler that retries forever; the failures still show up in the log
pub fn retry_on_fault() -> FaultHandler {
    Arc::new(|_: &FlushFault<'_>| FaultAction::Retry)
}

pub(crate) fn abort_process(fault: &FlushFault<'_>) -> ! {
    error!(
        path = %fault.path.display(),
        error = %fault.error,
        "{} failed, aborting to avoid losing the unsaved value",
        fault.context
    );
    std::process::abort()
}
