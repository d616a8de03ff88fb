//! When mutations turn into writes

use std::time::Duration;

/// Delay used by `UpdatePolicy::default()`
pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

/// The manner in which storage is updated when the value changes
///
/// Chosen when a cell is built and fixed for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Every mutation is written before `set` returns
    Immediate,
    /// Write once the value has been left alone for the given delay.
    /// Each mutation restarts the countdown (trailing-edge debounce).
    Debounced(Duration),
    /// Only explicit `save`/`load` touch storage
    Manual,
}

impl UpdatePolicy {
    /// Debounce after `seconds` of inactivity
    ///
    /// Negative and NaN inputs mean no delay; anything too large for a
    /// `Duration` saturates at `Duration::MAX`.
    pub fn after_idle(seconds: f64) -> Self {
        // f64::max discards NaN
        let delay = Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or(Duration::MAX);
        UpdatePolicy::Debounced(delay)
    }

    /// Countdown length, for `Debounced` only
    pub fn delay(&self) -> Option<Duration> {
        match self {
            UpdatePolicy::Debounced(delay) => Some(*delay),
            _ => None,
        }
    }

    /// Whether mutations schedule writes on their own
    pub fn is_automatic(&self) -> bool {
        !matches!(self, UpdatePolicy::Manual)
    }
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        UpdatePolicy::Debounced(DEFAULT_DELAY)
    }
}
