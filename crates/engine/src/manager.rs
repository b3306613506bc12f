//! Slot manager: the only component allowed to initiate a save, load, or
//! slot switch.
//!
//! Explicitly constructed and owned by the host (no global singleton).
//! One mutex per slot guarantees at most one save or load in flight for
//! that slot; different slots own disjoint files and may proceed
//! independently. The state machine per slot is
//! `Uninitialized -> Loaded -> { Saving -> Loaded | LoadFailed -> New }`.

use std::fs;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use keepsake_core::{
    CancelToken, LoadError, RegressionReport, SaveError, SaveState, SlotIndex, SlotPaths,
    StoreConfig, SLOT_COUNT,
};
use keepsake_storage::prefs::SELECTED_SLOT;
use keepsake_storage::{
    archive_snapshot, encode_payload, latest_archive, load_generations, migrate_if_needed,
    peek_timestamp, probe_legacy, write_snapshot, PrefStore, SigningKey,
};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::regression::detect_regression;

/// Where a slot currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPhase {
    /// Never loaded this process run.
    Uninitialized,
    /// A state has been loaded (or freshly created).
    Loaded,
    /// A save is in flight.
    Saving,
    /// Every load candidate failed; a fresh state is being handed out.
    LoadFailed,
}

/// Result of a load, surfaced to the host.
#[derive(Debug)]
pub enum LoadOutcome<T> {
    /// A snapshot was recovered and verified.
    Loaded {
        /// The recovered state.
        state: T,
        /// Present when the loaded data looks suspiciously regressed;
        /// the host must present the keep/restore choice and call
        /// [`SlotManager::resolve_regression`].
        regression: Option<RegressionReport>,
    },
    /// No compatible save was found anywhere; a fresh state was created.
    Fresh {
        /// The fresh state.
        state: T,
        /// User-facing notice. `None` when the slot was intentionally
        /// wiped (a silent fresh start).
        notice: Option<String>,
        /// Newest backup that exists on disk, even though it could not
        /// be auto-verified.
        backup_hint: Option<DateTime<Utc>>,
    },
}

/// The user's answer to a regression prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegressionDecision {
    /// Accept the loaded data; re-stamp the metadata record so the same
    /// regression is not re-reported next run.
    KeepLoaded,
    /// Restore the most recent backup (rotated generation or timestamped
    /// archive, whichever is newer) and reload.
    RestoreBackup,
}

/// Owner of all persistence for up to three save slots.
pub struct SlotManager<T: SaveState> {
    config: StoreConfig,
    key: SigningKey,
    prefs: PrefStore,
    phases: [Mutex<SlotPhase>; SLOT_COUNT],
    current: AtomicU8,
    _state: PhantomData<fn() -> T>,
}

impl<T: SaveState> SlotManager<T> {
    /// Open the store: load (or create) the signing key, open the
    /// preference store, run one-shot migrations, and restore the
    /// previously selected slot.
    pub fn open(config: StoreConfig) -> Self {
        if let Err(err) = fs::create_dir_all(config.saves_dir()) {
            warn!(%err, "could not create saves directory");
        }
        let key = SigningKey::load_or_create(&config.secret_path());
        let prefs = PrefStore::open(config.prefs_path());

        migrate_if_needed::<T>(&config, &prefs, &key);

        let current = prefs
            .get_f64(SELECTED_SLOT)
            .map(|v| SlotIndex::clamped(v as u8).get())
            .unwrap_or(0);

        Self {
            config,
            key,
            prefs,
            phases: std::array::from_fn(|_| Mutex::new(SlotPhase::Uninitialized)),
            current: AtomicU8::new(current),
            _state: PhantomData,
        }
    }

    /// The currently selected slot.
    pub fn current_slot(&self) -> SlotIndex {
        SlotIndex::clamped(self.current.load(Ordering::Acquire))
    }

    /// Lifecycle phase of a slot (diagnostics and tests).
    pub fn phase(&self, slot: SlotIndex) -> SlotPhase {
        *self.phases[slot.get() as usize].lock()
    }

    /// Whether saves made this run can be verified by later runs.
    pub fn key_is_ephemeral(&self) -> bool {
        self.key.is_ephemeral()
    }

    // ========================================================================
    // Save
    // ========================================================================

    /// Save `state` into the current slot. Returns false on failure; the
    /// previous snapshot is intact either way.
    pub fn save(&self, state: &T) -> bool {
        match self.save_with(state, &CancelToken::new()) {
            Ok(()) => true,
            Err(err) => {
                warn!(slot = %self.current_slot(), %err, "save failed");
                false
            }
        }
    }

    /// Save with an explicit cancellation token.
    pub fn save_with(&self, state: &T, cancel: &CancelToken) -> Result<(), SaveError> {
        let slot = self.current_slot();
        let mut phase = self.phases[slot.get() as usize].lock();
        *phase = SlotPhase::Saving;

        let result = self.write_current(slot, state, cancel);
        *phase = SlotPhase::Loaded;
        result?;

        // Metadata record follows every successful save; the deleted
        // marker clears on the first save into a wiped slot.
        let prefix = self.config.variant.prefix();
        let summary = state.summary();
        let mut record = self.prefs.slot_record(&prefix, slot);
        record.completion_percent = summary.completion_percent;
        record.playtime_seconds = summary.playtime_seconds;
        record.last_quit_utc = summary.last_quit_utc;
        self.prefs.set_slot_record(&prefix, slot, &record);
        self.prefs.clear_slot_deleted(&prefix, slot);
        Ok(())
    }

    /// Save and append a timestamped archive copy. Used by the host's
    /// quit and autosave paths; an archive failure never fails the save.
    pub fn save_and_archive(&self, state: &T) -> bool {
        if !self.save(state) {
            return false;
        }
        let slot = self.current_slot();
        let paths = self.slot_paths(slot);
        let backups = self.config.backups_dir(slot);
        if let Err(err) = archive_snapshot(
            &backups,
            &paths.canonical,
            Utc::now(),
            self.config.archives_to_keep,
        ) {
            warn!(slot = %slot, %err, "archive copy failed");
        }
        true
    }

    fn write_current(&self, slot: SlotIndex, state: &T, cancel: &CancelToken) -> Result<(), SaveError> {
        let payload = encode_payload(state)?;
        let paths = self.slot_paths(slot);
        write_snapshot(
            &paths,
            &self.key,
            T::SCHEMA_VERSION,
            &self.config.build_id,
            &payload,
            cancel,
        )?;
        Ok(())
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// Load the current slot, falling back through backup generations
    /// and the legacy probe before creating a fresh state.
    pub fn load(&self) -> LoadOutcome<T> {
        let slot = self.current_slot();
        let prefix = self.config.variant.prefix();
        let mut phase = self.phases[slot.get() as usize].lock();

        // The probe and migrations must not resurrect a wiped slot.
        let wiped = self.prefs.is_slot_deleted(&prefix, slot);

        match self.load_verified(slot, !wiped) {
            Ok(state) => {
                *phase = SlotPhase::Loaded;
                let regression = self.check_regression(slot, &state);
                LoadOutcome::Loaded { state, regression }
            }
            Err(LoadError::NoCompatibleSave { backup_hint }) => {
                if wiped {
                    info!(slot = %slot, "slot was intentionally wiped; starting fresh silently");
                    *phase = SlotPhase::Loaded;
                    return LoadOutcome::Fresh {
                        state: T::default(),
                        notice: None,
                        backup_hint: None,
                    };
                }

                *phase = SlotPhase::LoadFailed;
                let notice = format!(
                    "Save data for File {} could not be loaded. A new game will be created.{}",
                    slot.get() + 1,
                    match backup_hint {
                        Some(ts) =>
                            format!(" A backup from {} exists and may be restorable.", ts.to_rfc3339()),
                        None => String::new(),
                    }
                );
                warn!(slot = %slot, "no compatible save found");
                *phase = SlotPhase::Loaded;
                LoadOutcome::Fresh {
                    state: T::default(),
                    notice: Some(notice),
                    backup_hint,
                }
            }
        }
    }

    /// The fallback chain as data: generations first, then (optionally)
    /// the legacy probe. A probe hit is re-persisted canonically so
    /// future loads skip the probe.
    fn load_verified(&self, slot: SlotIndex, probe: bool) -> Result<T, LoadError> {
        let paths = self.slot_paths(slot);
        if let Some(state) = load_generations::<T>(&paths, &self.key) {
            return Ok(state);
        }

        if probe {
            if let Some(hit) = probe_legacy::<T>(
                &self.config.saves_dir(),
                &paths.dir,
                slot,
                self.config.variant,
                &self.key,
            ) {
                if let Err(err) = self.write_current(slot, &hit.state, &CancelToken::new()) {
                    warn!(slot = %slot, %err, "could not re-persist recovered legacy save");
                }
                return Ok(hit.state);
            }
        }

        Err(LoadError::NoCompatibleSave {
            backup_hint: self.backup_hint(slot),
        })
    }

    fn check_regression(&self, slot: SlotIndex, state: &T) -> Option<RegressionReport> {
        let prefix = self.config.variant.prefix();
        if !self.prefs.has_slot_record(&prefix, slot) {
            return None;
        }
        let record = self.prefs.slot_record(&prefix, slot);
        let report = detect_regression(&self.config.tolerances, &record, &state.summary())?;

        // Persist only the occurrence; the record's summary fields keep
        // describing what the device last observed until the user decides.
        let mut flagged = record;
        flagged.regression_flag = true;
        flagged.regression_info = report.message();
        self.prefs.set_slot_record(&prefix, slot, &flagged);
        Some(report)
    }

    /// Newest backup timestamp visible for the slot: rotated generations
    /// (header timestamp, unverified) or the newest timestamped archive.
    fn backup_hint(&self, slot: SlotIndex) -> Option<DateTime<Utc>> {
        let paths = self.slot_paths(slot);
        let rotated = [&paths.prev1, &paths.prev2]
            .into_iter()
            .filter_map(|p| peek_timestamp(p))
            .max();
        let archived = latest_archive(&self.config.backups_dir(slot)).map(|(_, ts)| ts);
        rotated.into_iter().chain(archived).max()
    }

    // ========================================================================
    // Slot selection
    // ========================================================================

    /// Switch to another slot, saving the outgoing state first so no
    /// data is lost, then load the incoming slot.
    pub fn select_slot(&self, index: SlotIndex, outgoing: &T) -> LoadOutcome<T> {
        if index == self.current_slot() {
            return self.load();
        }

        if !self.save(outgoing) {
            warn!(slot = %self.current_slot(), "pre-switch save failed; previous snapshot stands");
        }

        self.current.store(index.get(), Ordering::Release);
        self.prefs
            .set(SELECTED_SLOT, serde_json::Value::from(index.get()));
        self.load()
    }

    // ========================================================================
    // Regression resolution
    // ========================================================================

    /// Apply the user's keep/restore decision for a flagged load.
    ///
    /// `KeepLoaded` returns `None`; `RestoreBackup` returns the reload
    /// outcome.
    pub fn resolve_regression(
        &self,
        decision: RegressionDecision,
        loaded: &T,
    ) -> Option<LoadOutcome<T>> {
        let slot = self.current_slot();
        let prefix = self.config.variant.prefix();
        match decision {
            RegressionDecision::KeepLoaded => {
                let summary = loaded.summary();
                let record = keepsake_core::DeviceMetadataRecord {
                    completion_percent: summary.completion_percent,
                    playtime_seconds: summary.playtime_seconds,
                    last_quit_utc: summary.last_quit_utc,
                    regression_flag: false,
                    regression_info: String::new(),
                };
                self.prefs.set_slot_record(&prefix, slot, &record);
                None
            }
            RegressionDecision::RestoreBackup => {
                self.restore_newest_backup(slot);
                Some(self.load())
            }
        }
    }

    /// Copy the newest backup over the canonical file, preferring the
    /// newer of the generation-1 backup and the newest archive.
    fn restore_newest_backup(&self, slot: SlotIndex) {
        let paths = self.slot_paths(slot);
        let rotated = peek_timestamp(&paths.prev1).map(|ts| (paths.prev1.clone(), ts));
        let archived = latest_archive(&self.config.backups_dir(slot));

        let source = match (rotated, archived) {
            (Some((rp, rt)), Some((ap, at))) => Some(if at > rt { (ap, at) } else { (rp, rt) }),
            (Some(r), None) => Some(r),
            (None, Some(a)) => Some(a),
            (None, None) => None,
        };

        match source {
            Some((path, ts)) => {
                info!(slot = %slot, from = %path.display(), timestamp = %ts, "restoring backup over canonical");
                if let Err(err) = fs::copy(&path, &paths.canonical) {
                    warn!(slot = %slot, %err, "backup restore failed");
                }
            }
            None => warn!(slot = %slot, "no backup available to restore"),
        }
    }

    // ========================================================================
    // Queries and wipe
    // ========================================================================

    /// Seconds away since the state's recorded quit time. Zero when the
    /// state has never been quit-stamped or the clock went backwards.
    pub fn time_away(&self, state: &T) -> Duration {
        match state.summary().last_quit_utc {
            Some(quit) => (Utc::now() - quit).to_std().unwrap_or(Duration::ZERO),
            None => Duration::ZERO,
        }
    }

    /// Delete a slot's snapshot files and mark it intentionally wiped so
    /// neither the probe nor the migrations resurrect it. The marker
    /// clears on the next successful save into the slot.
    pub fn wipe_slot(&self, slot: SlotIndex) {
        let prefix = self.config.variant.prefix();
        let mut phase = self.phases[slot.get() as usize].lock();

        let paths = self.slot_paths(slot);
        for path in [
            &paths.temp,
            &paths.canonical,
            &paths.prev1,
            &paths.prev2,
            &paths.meta,
        ] {
            if path.exists() {
                if let Err(err) = fs::remove_file(path) {
                    warn!(path = %path.display(), %err, "wipe could not remove file");
                }
            }
        }

        self.prefs
            .set_slot_record(&prefix, slot, &Default::default());
        self.prefs.mark_slot_deleted(&prefix, slot);
        *phase = SlotPhase::Uninitialized;
        info!(slot = %slot, "slot wiped");
    }

    fn slot_paths(&self, slot: SlotIndex) -> SlotPaths {
        SlotPaths::in_dir(self.config.slot_dir(slot))
    }
}

impl<T: SaveState> std::fmt::Debug for SlotManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotManager")
            .field("current", &self.current_slot())
            .field("root", &self.config.root)
            .finish()
    }
}
