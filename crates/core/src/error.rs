//! Error taxonomy for the save engine.
//!
//! Per-candidate read failures ([`SnapshotReadError`]) are absorbed by the
//! fallback loader and never escalate; only [`LoadError::NoCompatibleSave`]
//! and an active regression report propagate to the slot manager.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// A save attempt failed. The previous canonical file is always intact.
#[derive(Debug, Error)]
pub enum SaveError {
    /// I/O error while writing or syncing the temp file.
    #[error("write failure: {0}")]
    Write(#[from] std::io::Error),

    /// The just-written temp file did not verify on re-read.
    #[error("verification of freshly written snapshot failed")]
    Verification,

    /// Payload serialization failed.
    #[error("payload encode failed: {0}")]
    Encode(String),

    /// The caller cancelled before the snapshot was committed.
    #[error("save cancelled")]
    Cancelled,
}

/// Why one snapshot candidate (a single file) could not be read.
///
/// All variants are treated identically by the fallback chain: log and
/// move to the next candidate.
#[derive(Debug, Error)]
pub enum SnapshotReadError {
    /// No file at the candidate path.
    #[error("snapshot file missing")]
    Missing,

    /// The file exists but could not be read.
    #[error("snapshot read failed: {0}")]
    Io(#[from] std::io::Error),

    /// The integrity header could not be decoded.
    #[error("header decode failed: {0}")]
    Header(String),

    /// The recomputed MAC did not match the stored signature.
    #[error("signature mismatch")]
    MacMismatch,

    /// The payload verified but does not match the expected schema.
    #[error("payload deserialize failed: {0}")]
    Deserialize(String),
}

/// A load exhausted every candidate. The only hard load failure.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Canonical, both backups, and the legacy key probe all failed.
    #[error("no compatible save found")]
    NoCompatibleSave {
        /// Timestamp of the newest backup that exists on disk, even if it
        /// could not be auto-verified. Shown to the user as a hint.
        backup_hint: Option<DateTime<Utc>>,
    },
}
