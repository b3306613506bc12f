//! Append-only timestamped archive copies.
//!
//! Separate from the rotating generations: after quit and autosave
//! commits, the canonical snapshot is copied to
//! `Backups/<slot>/<slot>_<yyyyMMdd-HHmmssSSS>.bin` and the oldest
//! copies beyond the retention count are pruned. File names sort
//! lexicographically in timestamp order.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, warn};

/// Timestamp format embedded in archive file names.
const STAMP_FORMAT: &str = "%Y%m%d-%H%M%S%3f";

/// Copy `canonical` into the slot's archive directory, stamped with
/// `now`, and prune beyond `keep` copies. Best-effort by design; errors
/// are returned so the caller can log them but a failed archive never
/// fails a save.
pub fn archive_snapshot(
    backups_dir: &Path,
    canonical: &Path,
    now: DateTime<Utc>,
    keep: usize,
) -> std::io::Result<PathBuf> {
    fs::create_dir_all(backups_dir)?;
    let base = backups_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("slot");
    let name = format!("{base}_{}.bin", now.format(STAMP_FORMAT));
    let target = backups_dir.join(name);
    fs::copy(canonical, &target)?;
    debug!(path = %target.display(), "archive copy written");

    prune(backups_dir, base, keep);
    Ok(target)
}

/// Newest archive for the slot, with the timestamp parsed back out of
/// its file name.
pub fn latest_archive(backups_dir: &Path) -> Option<(PathBuf, DateTime<Utc>)> {
    let base = backups_dir.file_name().and_then(|n| n.to_str())?;
    let mut stamped = list_stamped(backups_dir, base);
    stamped.pop()
}

fn list_stamped(backups_dir: &Path, base: &str) -> Vec<(PathBuf, DateTime<Utc>)> {
    let mut out = Vec::new();
    let entries = match fs::read_dir(backups_dir) {
        Ok(e) => e,
        Err(_) => return out,
    };
    let prefix = format!("{base}_");
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(stamp) = name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(".bin"))
        else {
            continue;
        };
        if let Ok(naive) = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT) {
            out.push((path, naive.and_utc()));
        }
    }
    // Lexicographic file-name order equals timestamp order; sort by the
    // parsed stamp for robustness.
    out.sort_by_key(|(_, ts)| *ts);
    out
}

fn prune(backups_dir: &Path, base: &str, keep: usize) {
    let stamped = list_stamped(backups_dir, base);
    if stamped.len() <= keep {
        return;
    }
    let excess = stamped.len() - keep;
    for (path, _) in stamped.into_iter().take(excess) {
        if let Err(err) = fs::remove_file(&path) {
            warn!(path = %path.display(), %err, "archive prune failed");
        }
    }
}
