//! Fallback loader.
//!
//! Primary chain: canonical file, generation-1 backup, generation-2
//! backup, each fully verified before its payload is deserialized. Any
//! per-candidate failure is logged and absorbed; exhausting the chain is
//! the only hard failure.
//!
//! Secondary chain: before concluding a slot has no save at all, probe an
//! ordered priority list of historical file-name variants against the
//! slot directory and then against any plausible file in the saves root.
//! The first verified match wins and the caller re-persists it under the
//! canonical name so future loads skip the probe.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use keepsake_core::{
    is_canonical_layout_name, BuildVariant, SaveState, SlotIndex, SlotPaths, SnapshotReadError,
};
use tracing::{debug, info, warn};

use crate::codec;
use crate::header;
use crate::secret::SigningKey;

/// Extension used by legacy flat save files.
const LEGACY_EXTENSIONS: &[&str] = &["sav", "bin"];

/// Highest prerelease iteration ever shipped; the probe covers 0..=12.
pub const PRERELEASE_PROBE_MAX: u32 = 12;

/// A snapshot recovered through the legacy probe.
#[derive(Debug)]
pub struct LegacyHit<T> {
    /// The recovered state.
    pub state: T,
    /// File the state was read from.
    pub path: PathBuf,
    /// Candidate name that matched, when the hit came from the name
    /// probe rather than the any-file scan.
    pub matched_name: Option<String>,
}

/// Read and fully verify one snapshot file, then deserialize its payload.
pub fn read_snapshot_file<T: SaveState>(
    path: &Path,
    key: &SigningKey,
) -> Result<T, SnapshotReadError> {
    if !path.exists() {
        return Err(SnapshotReadError::Missing);
    }
    let bytes = fs::read(path)?;
    let (_, payload) = header::verify_and_split(key, &bytes)?;
    codec::decode_payload(payload)
}

/// Try the three on-disk generations in order.
pub fn load_generations<T: SaveState>(paths: &SlotPaths, key: &SigningKey) -> Option<T> {
    for candidate in paths.generations() {
        match read_snapshot_file::<T>(candidate, key) {
            Ok(state) => {
                debug!(path = %candidate.display(), "snapshot loaded");
                return Some(state);
            }
            Err(SnapshotReadError::Missing) => {}
            Err(err) => {
                warn!(path = %candidate.display(), %err, "snapshot candidate rejected; trying next generation");
            }
        }
    }
    None
}

/// Ordered priority list of historical file-name variants for `slot`.
///
/// First match wins, so the order is deliberate: canonical name for the
/// current variant, same-prefix other slots (covers mismatched file/key
/// bugs in old builds), unprefixed names, the bounded historical
/// prerelease range, then generic names seen in the earliest builds.
/// De-duplicated preserving order.
pub fn candidate_names(slot: SlotIndex, variant: BuildVariant) -> Vec<String> {
    let prefix = variant.prefix();
    let mut names = Vec::with_capacity(64);

    for ext in LEGACY_EXTENSIONS {
        names.push(format!("{prefix}Sd{slot}.{ext}"));
    }
    for other in SlotIndex::all() {
        for ext in LEGACY_EXTENSIONS {
            names.push(format!("{prefix}Sd{other}.{ext}"));
        }
    }
    for other in SlotIndex::all() {
        for ext in LEGACY_EXTENSIONS {
            names.push(format!("Sd{other}.{ext}"));
        }
    }
    for b in 0..=PRERELEASE_PROBE_MAX {
        for other in SlotIndex::all() {
            for ext in LEGACY_EXTENSIONS {
                names.push(format!("Beta{b}Sd{other}.{ext}"));
            }
        }
    }
    for generic in ["Data", "SaveData", "GameData"] {
        for ext in LEGACY_EXTENSIONS {
            names.push(format!("{generic}.{ext}"));
        }
    }

    let mut seen = HashSet::new();
    names.retain(|n| seen.insert(n.clone()));
    names
}

/// Parse a slot index out of a legacy file name: digits after the last
/// `Sd` or `Data` marker, in 0..=2.
pub fn parse_slot_from_name(name: &str) -> Option<SlotIndex> {
    for marker in ["Sd", "Data"] {
        if let Some(pos) = name.rfind(marker) {
            let rest = &name[pos + marker.len()..];
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                continue;
            }
            if let Ok(parsed) = digits.parse::<u8>() {
                if let Some(slot) = SlotIndex::new(parsed) {
                    return Some(slot);
                }
            }
        }
    }
    None
}

/// Probe legacy name variants for `slot`, then any plausible file in the
/// saves root. Returns the first verified hit.
pub fn probe_legacy<T: SaveState>(
    saves_dir: &Path,
    slot_dir: &Path,
    slot: SlotIndex,
    variant: BuildVariant,
    key: &SigningKey,
) -> Option<LegacyHit<T>> {
    // Phase 1: named candidates, in the slot directory and the root.
    for name in candidate_names(slot, variant) {
        for base in [slot_dir, saves_dir] {
            let path = base.join(&name);
            match read_snapshot_file::<T>(&path, key) {
                Ok(state) => {
                    info!(path = %path.display(), name, "legacy save recovered via name probe");
                    return Some(LegacyHit {
                        state,
                        path,
                        matched_name: Some(name),
                    });
                }
                Err(SnapshotReadError::Missing) => {}
                Err(err) => {
                    debug!(path = %path.display(), %err, "legacy candidate rejected");
                }
            }
        }
    }

    // Phase 2: any plausible file in the saves root.
    for path in scan_plausible_files(saves_dir) {
        match read_snapshot_file::<T>(&path, key) {
            Ok(state) => {
                info!(path = %path.display(), "legacy save recovered via directory scan");
                return Some(LegacyHit {
                    state,
                    path,
                    matched_name: None,
                });
            }
            Err(err) => {
                debug!(path = %path.display(), %err, "scanned file rejected");
            }
        }
    }

    None
}

/// Top-level files in the saves root that could plausibly be save files:
/// legacy extensions only, canonical layout names excluded, hidden files
/// (the signing key) excluded.
pub fn scan_plausible_files(saves_dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let entries = match fs::read_dir(saves_dir) {
        Ok(e) => e,
        Err(_) => return out,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('.') || is_canonical_layout_name(name) {
            continue;
        }
        let plausible = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| LEGACY_EXTENSIONS.contains(&e))
            .unwrap_or(false);
        if plausible {
            out.push(path);
        }
    }
    out.sort();
    out
}
