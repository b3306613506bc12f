//! Atomic snapshot writer and backup rotator.
//!
//! Write path: temp file, full re-read verification, then rotation with
//! the canonical file renamed into place last. A process killed at any
//! point leaves either the previous canonical file or the new one, never
//! zero generations and never a torn file under the canonical name.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use keepsake_core::{CancelToken, SaveError, SlotPaths};
use serde::Serialize;
use tracing::{debug, warn};

use crate::header::{self, IntegrityHeader};
use crate::secret::SigningKey;

/// Diagnostic sidecar written best-effort after each save. Never read
/// back as an authority.
#[derive(Debug, Serialize)]
struct SlotMeta<'a> {
    schema_version: u32,
    timestamp_utc: String,
    build_id: &'a str,
    size_bytes: u32,
    integrity: &'a str,
}

/// Write a signed snapshot into `paths`, rotating the previous
/// generations.
///
/// Fails without touching the canonical file if the temp write, the
/// re-read verification, or the cancellation check fails. Rotation-step
/// failures (other than the final rename) are logged and tolerated.
pub fn write_snapshot(
    paths: &SlotPaths,
    key: &SigningKey,
    schema_version: u32,
    build_id: &str,
    payload: &[u8],
    cancel: &CancelToken,
) -> Result<IntegrityHeader, SaveError> {
    fs::create_dir_all(&paths.dir)?;

    let header = IntegrityHeader::new(schema_version, Utc::now(), build_id, payload.len());
    let bytes = header::encode_snapshot(key, header, payload);

    if cancel.is_cancelled() {
        return Err(SaveError::Cancelled);
    }

    // Write to temp, flushed and synced before verification.
    if let Err(err) = write_temp(&paths.temp, &bytes) {
        remove_quietly(&paths.temp);
        return Err(SaveError::Write(err));
    }

    if cancel.is_cancelled() {
        remove_quietly(&paths.temp);
        return Err(SaveError::Cancelled);
    }

    // Re-open and fully re-verify. A write that cannot be verified is a
    // failed save; the previous canonical file stands.
    let written = match fs::read(&paths.temp) {
        Ok(b) => b,
        Err(err) => {
            remove_quietly(&paths.temp);
            return Err(SaveError::Write(err));
        }
    };
    let verified = match header::verify_and_split(key, &written) {
        Ok((h, _)) => h,
        Err(err) => {
            warn!(path = %paths.temp.display(), %err, "freshly written snapshot failed verification");
            remove_quietly(&paths.temp);
            return Err(SaveError::Verification);
        }
    };

    if cancel.is_cancelled() {
        remove_quietly(&paths.temp);
        return Err(SaveError::Cancelled);
    }

    // Rotate. Canonical is renamed into place last, so a crash
    // mid-rotation can only leave stale backups, never zero generations.
    if paths.prev2.exists() {
        if let Err(err) = fs::remove_file(&paths.prev2) {
            warn!(path = %paths.prev2.display(), %err, "could not prune generation 2");
        }
    }
    rename_quietly(&paths.prev1, &paths.prev2);
    rename_quietly(&paths.canonical, &paths.prev1);
    fs::rename(&paths.temp, &paths.canonical)?;

    debug!(
        path = %paths.canonical.display(),
        size = payload.len(),
        "snapshot committed"
    );

    write_meta_sidecar(&paths.meta, &verified);
    Ok(verified)
}

fn write_temp(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(bytes)?;
    file.flush()?;
    file.sync_all()
}

fn rename_quietly(from: &Path, to: &Path) {
    if from.exists() {
        if let Err(err) = fs::rename(from, to) {
            warn!(from = %from.display(), to = %to.display(), %err, "rotation rename failed");
        }
    }
}

fn remove_quietly(path: &Path) {
    if path.exists() {
        let _ = fs::remove_file(path);
    }
}

fn write_meta_sidecar(path: &Path, header: &IntegrityHeader) {
    let meta = SlotMeta {
        schema_version: header.schema_version,
        timestamp_utc: header.timestamp_utc.to_rfc3339(),
        build_id: &header.build_id,
        size_bytes: header.payload_size,
        integrity: "ok",
    };
    match serde_json::to_string_pretty(&meta) {
        Ok(json) => {
            if let Err(err) = fs::write(path, json) {
                warn!(path = %path.display(), %err, "meta sidecar write failed");
            }
        }
        Err(err) => warn!(%err, "meta sidecar encode failed"),
    }
}

/// Read the header timestamp of a snapshot file without verifying its
/// signature. Used only for backup hints and restore-candidate ordering,
/// never to accept data.
pub fn peek_timestamp(path: &Path) -> Option<DateTime<Utc>> {
    let bytes = fs::read(path).ok()?;
    let (header, _) = IntegrityHeader::decode(&bytes).ok()?;
    Some(header.timestamp_utc)
}
