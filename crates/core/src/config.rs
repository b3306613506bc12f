//! Engine configuration.
//!
//! Tolerances and retention counts are product-tuning inputs, not
//! structural constants; defaults match the values the shipped game used.

use std::path::{Path, PathBuf};

use crate::types::{BuildVariant, SlotIndex};

/// Thresholds for the regression detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionTolerances {
    /// Playtime may drop this many seconds before being flagged.
    pub playtime_drop_secs: f64,
    /// Completion may drop this many percentage points before being flagged.
    pub completion_drop_pct: f32,
    /// The previously seen save may be this many minutes newer before
    /// being flagged (absorbs clock skew between devices).
    pub clock_grace_mins: i64,
}

impl Default for RegressionTolerances {
    fn default() -> Self {
        Self {
            playtime_drop_secs: 600.0,
            completion_drop_pct: 5.0,
            clock_grace_mins: 10,
        }
    }
}

/// Configuration for a save store rooted at one directory.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root directory (the platform's persistent-data path).
    pub root: PathBuf,
    /// Build identifier stamped into snapshot headers (e.g. "1.4.2").
    pub build_id: String,
    /// Which build family this process belongs to.
    pub variant: BuildVariant,
    /// Timestamped archives retained per slot before pruning.
    pub archives_to_keep: usize,
    /// Regression detector thresholds.
    pub tolerances: RegressionTolerances,
}

impl StoreConfig {
    /// Create a config with defaults for everything but the root and build id.
    pub fn new(root: impl Into<PathBuf>, build_id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            build_id: build_id.into(),
            variant: BuildVariant::Stable,
            archives_to_keep: 10,
            tolerances: RegressionTolerances::default(),
        }
    }

    /// Set the build variant.
    pub fn variant(mut self, variant: BuildVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Set the archive retention count.
    pub fn archives_to_keep(mut self, count: usize) -> Self {
        self.archives_to_keep = count;
        self
    }

    /// Set the regression tolerances.
    pub fn tolerances(mut self, tolerances: RegressionTolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    /// Directory holding all slots, the signing key, and the archives.
    pub fn saves_dir(&self) -> PathBuf {
        self.root.join("Saves")
    }

    /// Directory for one slot, honoring the variant prefix so prerelease
    /// builds never write over stable data.
    pub fn slot_dir(&self, slot: SlotIndex) -> PathBuf {
        self.saves_dir()
            .join(format!("{}{}", self.variant.prefix(), slot.dir_name()))
    }

    /// Slot directory for an explicit variant (used by migration).
    pub fn slot_dir_for(&self, variant: BuildVariant, slot: SlotIndex) -> PathBuf {
        self.saves_dir()
            .join(format!("{}{}", variant.prefix(), slot.dir_name()))
    }

    /// Signing key file path, outside all slot directories.
    pub fn secret_path(&self) -> PathBuf {
        self.saves_dir().join(".mac.secret")
    }

    /// Preference store file path.
    pub fn prefs_path(&self) -> PathBuf {
        self.root.join("prefs.json")
    }

    /// Timestamped-archive directory for one slot.
    pub fn backups_dir(&self, slot: SlotIndex) -> PathBuf {
        let name = format!("{}{}", self.variant.prefix(), slot.dir_name());
        self.saves_dir().join("Backups").join(name)
    }
}

/// Returns true if `path` looks like part of the canonical slot layout
/// (and must therefore be skipped by directory scans).
pub fn is_canonical_layout_name(name: &str) -> bool {
    matches!(
        name,
        "snapshot.bin" | "snapshot.prev1.bin" | "snapshot.prev2.bin" | "snapshot.tmp" | "meta.json"
    )
}

/// File names inside one slot directory.
#[derive(Debug, Clone)]
pub struct SlotPaths {
    /// The slot directory itself.
    pub dir: PathBuf,
    /// Scratch file written and verified before rotation.
    pub temp: PathBuf,
    /// Generation 0.
    pub canonical: PathBuf,
    /// Generation 1.
    pub prev1: PathBuf,
    /// Generation 2.
    pub prev2: PathBuf,
    /// Best-effort diagnostic sidecar, never read back.
    pub meta: PathBuf,
}

impl SlotPaths {
    /// Resolve the canonical layout inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        Self {
            temp: dir.join("snapshot.tmp"),
            canonical: dir.join("snapshot.bin"),
            prev1: dir.join("snapshot.prev1.bin"),
            prev2: dir.join("snapshot.prev2.bin"),
            meta: dir.join("meta.json"),
            dir,
        }
    }

    /// Generations in fallback order: canonical, prev1, prev2.
    pub fn generations(&self) -> [&PathBuf; 3] {
        [&self.canonical, &self.prev1, &self.prev2]
    }
}
