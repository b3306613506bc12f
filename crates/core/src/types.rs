//! Slot identity, the save-state contract, and regression reporting types.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Number of save slots per installation.
pub const SLOT_COUNT: usize = 3;

/// Identity of one save slot (0..=2).
///
/// Each slot owns a disjoint directory on disk; exactly one slot is
/// "current" per slot manager at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotIndex(u8);

impl SlotIndex {
    /// Create a slot index, rejecting out-of-range values.
    pub fn new(index: u8) -> Option<Self> {
        if (index as usize) < SLOT_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Create a slot index, clamping out-of-range values into 0..=2.
    pub fn clamped(index: u8) -> Self {
        Self(index.min(SLOT_COUNT as u8 - 1))
    }

    /// Raw index value.
    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }

    /// Directory name for this slot under the saves root ("Save1".."Save3").
    pub fn dir_name(self) -> String {
        format!("Save{}", self.0 + 1)
    }

    /// Iterate all valid slot indices in order.
    pub fn all() -> impl Iterator<Item = SlotIndex> {
        (0..SLOT_COUNT as u8).map(SlotIndex)
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which build family wrote (or is writing) save data.
///
/// Prerelease builds keep their saves under prefixed names so they never
/// clobber stable data; the migration scanner later promotes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildVariant {
    /// Live/stable build. Uses unprefixed names.
    Stable,
    /// Prerelease build with an iteration number ("Beta3", "Beta7", ...).
    Prerelease(u32),
}

impl BuildVariant {
    /// Name prefix applied to slot directories and preference keys.
    pub fn prefix(self) -> String {
        match self {
            BuildVariant::Stable => String::new(),
            BuildVariant::Prerelease(n) => format!("Beta{n}"),
        }
    }
}

/// Summary fields every persisted state exposes for metadata tracking
/// and regression detection. A summary is never authoritative; the
/// snapshot payload is.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SlotSummary {
    /// Overall completion, in percentage points (0.0..=100.0).
    pub completion_percent: f32,
    /// Total playtime in seconds.
    pub playtime_seconds: f64,
    /// UTC timestamp recorded when the game last quit, if any.
    pub last_quit_utc: Option<DateTime<Utc>>,
}

/// Contract the host's root game-state type implements to be persisted.
///
/// The engine treats the payload as opaque beyond this trait: it is
/// serialized whole, restored whole, and summarized for the device
/// metadata record.
pub trait SaveState: Serialize + DeserializeOwned + Default {
    /// Version of the payload schema, stamped into every snapshot header.
    const SCHEMA_VERSION: u32;

    /// Summary fields used for slot metadata and regression detection.
    fn summary(&self) -> SlotSummary;
}

/// Per-slot, per-build-variant record of what this device last observed.
///
/// Stored in the preference store, outside the snapshot files, so it
/// survives even if every snapshot generation is lost.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceMetadataRecord {
    /// Last observed completion percentage.
    pub completion_percent: f32,
    /// Last observed playtime in seconds.
    pub playtime_seconds: f64,
    /// Last observed quit timestamp.
    pub last_quit_utc: Option<DateTime<Utc>>,
    /// Whether a regression was reported and not yet acknowledged.
    pub regression_flag: bool,
    /// Human-readable description of the last reported regression.
    pub regression_info: String,
}

/// Why a loaded snapshot was flagged as regressed, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegressionReason {
    /// Playtime dropped past the configured tolerance.
    PlaytimeDrop,
    /// Completion percentage dropped past the configured tolerance.
    CompletionDrop,
    /// The device last saw a save newer than the loaded one.
    OlderThanLastSeen,
}

impl fmt::Display for RegressionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegressionReason::PlaytimeDrop => write!(f, "playtime dropped"),
            RegressionReason::CompletionDrop => write!(f, "completion dropped"),
            RegressionReason::OlderThanLastSeen => write!(f, "save is older than last seen"),
        }
    }
}

/// Result of comparing a freshly loaded snapshot against the device
/// metadata record. Ephemeral; only its occurrence is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionReport {
    /// How much playtime was lost (positive = loaded has less).
    pub playtime_drop_seconds: f64,
    /// How much completion was lost (positive = loaded has less).
    pub completion_drop_percent: f32,
    /// How many minutes newer the previously seen save was.
    pub minutes_newer_previously: i64,
    /// Every condition that triggered, in priority order.
    pub reasons: Vec<RegressionReason>,
}

impl RegressionReport {
    /// The first triggering condition, reported as the primary reason.
    /// `None` only when `reasons` is empty, which the detector never
    /// produces.
    pub fn primary(&self) -> Option<RegressionReason> {
        self.reasons.first().copied()
    }

    /// One-line description suitable for the metadata record and logs.
    pub fn message(&self) -> String {
        let primary = match self.primary() {
            Some(reason) => reason.to_string(),
            None => "save regression suspected".to_string(),
        };
        format!(
            "{primary} (playtime -{:.0}s, completion -{:.1}%, previously {} min newer)",
            self.playtime_drop_seconds.max(0.0),
            self.completion_drop_percent.max(0.0),
            self.minutes_newer_previously.max(0),
        )
    }
}

/// Cooperative cancellation for save/load, checked before each blocking
/// I/O step. Cancelling mid-save leaves the canonical file untouched.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
