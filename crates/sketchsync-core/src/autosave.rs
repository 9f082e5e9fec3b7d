//! Periodic save requests.
//!
//! Persistence happens on the server; the client only tells it when the
//! board has changed and enough time has passed.

use std::time::{Duration, Instant};

/// Default auto-save interval in seconds.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 30;

/// Tracks unsaved changes and decides when to send a save request.
#[derive(Debug, Clone)]
pub struct AutoSaveTimer {
    /// Auto-save interval.
    interval: Duration,
    /// When the last save request went out.
    last_save: Option<Instant>,
    /// Whether the board has changes since the last request.
    dirty: bool,
}

impl AutoSaveTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_save: None,
            dirty: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Mark the board as having unsaved changes.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Start the interval from `now` without requiring a save.
    pub fn start(&mut self, now: Instant) {
        self.last_save.get_or_insert(now);
    }

    /// Check if enough time has passed for an auto-save.
    pub fn should_save(&self, now: Instant) -> bool {
        if !self.dirty {
            return false;
        }
        match self.last_save {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }

    pub fn mark_saved(&mut self, now: Instant) {
        self.last_save = Some(now);
        self.dirty = false;
    }
}

impl Default for AutoSaveTimer {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_AUTOSAVE_INTERVAL_SECS))
    }
}
