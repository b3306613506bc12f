//! One-shot legacy migrations into the canonical layout.
//!
//! Two independent migrations run once per installation, each gated by a
//! persisted marker in the preference store:
//!
//! (a) build-variant migration: stable builds adopt the newest
//!     prerelease slot data where the stable slot is empty;
//! (b) unrecognized-file migration: plausible save files under no
//!     canonical name are verified, matched to a slot, and copied in.
//!
//! Neither migration ever overwrites an existing canonical file, and a
//! single candidate's failure is logged and skipped, never fatal.

use std::fs;
use std::path::Path;

use keepsake_core::{BuildVariant, SaveState, SlotIndex, SlotPaths, StoreConfig};
use tracing::{debug, info, warn};

use crate::loader::{self, PRERELEASE_PROBE_MAX};
use crate::prefs::{PrefStore, GENERIC_MIGRATION_DONE, PRERELEASE_MIGRATION_DONE};
use crate::secret::SigningKey;

/// Run both migrations if their markers are unset. Invoked once per
/// process start by the slot manager.
pub fn migrate_if_needed<T: SaveState>(config: &StoreConfig, prefs: &PrefStore, key: &SigningKey) {
    migrate_from_prerelease(config, prefs);
    migrate_unrecognized::<T>(config, prefs, key);
}

/// (a) Build-variant migration.
///
/// Stable builds only: for each slot whose canonical file is missing,
/// adopt the highest prerelease iteration's slot data, preferring
/// `Beta12` down to `Beta0`. Also copies the prerelease metadata record
/// to the live keys when those are absent.
pub fn migrate_from_prerelease(config: &StoreConfig, prefs: &PrefStore) {
    if config.variant != BuildVariant::Stable {
        return;
    }
    if prefs.get_bool(PRERELEASE_MIGRATION_DONE).unwrap_or(false) {
        return;
    }

    for slot in SlotIndex::all() {
        let live = SlotPaths::in_dir(config.slot_dir_for(BuildVariant::Stable, slot));
        if live.canonical.exists() {
            continue;
        }
        if prefs.is_slot_deleted("", slot) {
            continue;
        }

        // Prefer the highest prerelease iteration present.
        for b in (0..=PRERELEASE_PROBE_MAX).rev() {
            let pre = SlotPaths::in_dir(config.slot_dir_for(BuildVariant::Prerelease(b), slot));
            if !pre.canonical.exists() {
                continue;
            }

            match copy_no_clobber(&pre.canonical, &live.canonical) {
                Ok(()) => {
                    info!(slot = %slot, iteration = b, "adopted prerelease save");
                    // Backup generation moves best-effort.
                    if pre.prev1.exists() && !live.prev1.exists() {
                        if let Err(err) = fs::copy(&pre.prev1, &live.prev1) {
                            warn!(slot = %slot, %err, "prerelease backup copy failed");
                        }
                    }
                }
                Err(err) => {
                    warn!(slot = %slot, iteration = b, %err, "prerelease migration failed for slot");
                }
            }
            break; // one iteration per slot, highest wins
        }
    }

    // Metadata records follow the same highest-iteration-wins rule.
    for slot in SlotIndex::all() {
        if prefs.has_slot_record("", slot) {
            continue;
        }
        for b in (0..=PRERELEASE_PROBE_MAX).rev() {
            let prefix = BuildVariant::Prerelease(b).prefix();
            if prefs.has_slot_record(&prefix, slot) {
                prefs.copy_slot_record(&prefix, "", slot);
                debug!(slot = %slot, iteration = b, "adopted prerelease slot metadata");
                break;
            }
        }
    }

    prefs.set(PRERELEASE_MIGRATION_DONE, serde_json::Value::from(true));
}

/// (b) Unrecognized-file migration.
///
/// Scans the saves root for plausible save files under no canonical
/// name, verifies each against the current signing key, infers the
/// target slot from the file name (or assigns the first free slot), and
/// copies the file into that slot's canonical path.
pub fn migrate_unrecognized<T: SaveState>(
    config: &StoreConfig,
    prefs: &PrefStore,
    key: &SigningKey,
) {
    if prefs.get_bool(GENERIC_MIGRATION_DONE).unwrap_or(false) {
        return;
    }

    let saves_dir = config.saves_dir();
    let candidates = loader::scan_plausible_files(&saves_dir);

    for path in candidates {
        if let Err(skip) = try_adopt_candidate::<T>(config, prefs, key, &path) {
            debug!(path = %path.display(), reason = skip, "migration candidate skipped");
        }
    }

    prefs.set(GENERIC_MIGRATION_DONE, serde_json::Value::from(true));
}

/// Attempt to adopt one scanned file. Returns the skip reason on failure;
/// failures never abort the scan.
fn try_adopt_candidate<T: SaveState>(
    config: &StoreConfig,
    prefs: &PrefStore,
    key: &SigningKey,
    path: &Path,
) -> Result<(), &'static str> {
    let state = loader::read_snapshot_file::<T>(path, key).map_err(|_| "unverifiable")?;

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or("unreadable name")?;

    let slot = match loader::parse_slot_from_name(name) {
        Some(slot) => slot,
        None => first_free_slot(config).ok_or("no free slot")?,
    };
    if prefs.is_slot_deleted(&config.variant.prefix(), slot) {
        return Err("slot intentionally deleted");
    }

    let live = SlotPaths::in_dir(config.slot_dir(slot));
    copy_no_clobber(path, &live.canonical).map_err(|_| "canonical exists or copy failed")?;

    // Record slot metadata from the adopted snapshot's summary.
    let summary = state.summary();
    let mut record = prefs.slot_record(&config.variant.prefix(), slot);
    record.completion_percent = summary.completion_percent;
    record.playtime_seconds = summary.playtime_seconds;
    record.last_quit_utc = summary.last_quit_utc;
    prefs.set_slot_record(&config.variant.prefix(), slot, &record);

    info!(path = %path.display(), slot = %slot, "unrecognized save migrated to canonical slot");
    Ok(())
}

fn first_free_slot(config: &StoreConfig) -> Option<SlotIndex> {
    SlotIndex::all().find(|&slot| {
        !SlotPaths::in_dir(config.slot_dir(slot))
            .canonical
            .exists()
    })
}

/// Copy `from` to `to`, creating parent directories, refusing to
/// overwrite an existing file.
fn copy_no_clobber(from: &Path, to: &Path) -> std::io::Result<()> {
    if to.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "target exists",
        ));
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(from, to)?;
    Ok(())
}
