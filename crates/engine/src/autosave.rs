//! Autosave interval policy.
//!
//! No internal threads: the host polls [`AutosavePolicy::due`] from its
//! update loop and calls save itself, keeping every save on the caller's
//! schedule. The first autosave is delayed separately so a fresh load is
//! not immediately re-written. Suspend and quit saves are explicit host
//! calls, outside this policy.

use std::time::{Duration, Instant};

/// Decides when the next periodic save is due.
#[derive(Debug, Clone)]
pub struct AutosavePolicy {
    interval: Duration,
    next_due: Instant,
    suspended: bool,
}

impl AutosavePolicy {
    /// Policy with a first save after `first_delay` and every `interval`
    /// thereafter.
    pub fn new(first_delay: Duration, interval: Duration) -> Self {
        Self {
            interval,
            next_due: Instant::now() + first_delay,
            suspended: false,
        }
    }

    /// Whether a periodic save is due at `now`. Suppressed while a
    /// regression or load-failure prompt is active.
    pub fn due(&self, now: Instant) -> bool {
        !self.suspended && now >= self.next_due
    }

    /// Record a completed save (periodic or otherwise) and schedule the
    /// next one a full interval out.
    pub fn mark_saved(&mut self, now: Instant) {
        self.next_due = now + self.interval;
    }

    /// Suppress periodic saves (prompt active, wipe in progress).
    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    /// Resume periodic saves, restarting the interval from `now`.
    pub fn resume(&mut self, now: Instant) {
        self.suspended = false;
        self.next_due = now + self.interval;
    }
}
