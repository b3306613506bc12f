//! Flat key/value preference store.
//!
//! Stands in for the platform's lightweight preference store: a single
//! JSON file of string keys holding the per-slot device metadata
//! records, one-shot migration markers, the selected slot, and
//! intentional-delete markers. Persistence is best-effort (temp file +
//! rename); the store is a summary, never the authority.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use keepsake_core::{DeviceMetadataRecord, SlotIndex};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::warn;

/// Key suffixes for the per-slot metadata record.
const COMPLETION: &str = "_Completion";
const PLAYTIME: &str = "_Playtime";
const DATE: &str = "_Date";
const REGRESSION_FLAG: &str = "_RegressionFlag";
const REGRESSION_INFO: &str = "_RegressionInfo";
const DELETED: &str = "_Deleted";

/// Marker keys for one-shot migrations and the persisted slot selection.
pub const PRERELEASE_MIGRATION_DONE: &str = "PrereleaseMigrationDone";
pub const GENERIC_MIGRATION_DONE: &str = "GenericMigrationDone";
pub const SELECTED_SLOT: &str = "SelectedSlot";

/// File-backed preference store.
pub struct PrefStore {
    path: PathBuf,
    map: Mutex<BTreeMap<String, Value>>,
}

impl PrefStore {
    /// Open the store at `path`, tolerating a missing or corrupt file.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let map = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(map) => map,
                Err(err) => {
                    warn!(path = %path.display(), %err, "preference store corrupt; starting empty");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self {
            path,
            map: Mutex::new(map),
        }
    }

    /// Persist the store. Best-effort: failures are logged, never raised.
    pub fn flush(&self) {
        let json = {
            let map = self.map.lock();
            match serde_json::to_string_pretty(&*map) {
                Ok(j) => j,
                Err(err) => {
                    warn!(%err, "preference store encode failed");
                    return;
                }
            }
        };
        let tmp = self.path.with_extension("tmp");
        let result = fs::write(&tmp, json).and_then(|_| fs::rename(&tmp, &self.path));
        if let Err(err) = result {
            warn!(path = %self.path.display(), %err, "preference store write failed");
        }
    }

    /// Set a value and persist.
    pub fn set(&self, key: &str, value: Value) {
        self.map.lock().insert(key.to_string(), value);
        self.flush();
    }

    /// Get a raw value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.map.lock().get(key).cloned()
    }

    /// Whether a key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.map.lock().contains_key(key)
    }

    /// Remove a key and persist. No-op when absent.
    pub fn remove(&self, key: &str) {
        if self.map.lock().remove(key).is_some() {
            self.flush();
        }
    }

    /// Get a float value.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key)?.as_f64()
    }

    /// Get a boolean value.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key)?.as_bool()
    }

    /// Get a string value.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key)?.as_str().map(str::to_string)
    }

    // ========================================================================
    // Slot metadata records
    // ========================================================================

    fn slot_key(prefix: &str, slot: SlotIndex, suffix: &str) -> String {
        format!("{prefix}Slot{slot}{suffix}")
    }

    /// Whether any metadata has ever been recorded for this slot.
    pub fn has_slot_record(&self, prefix: &str, slot: SlotIndex) -> bool {
        [COMPLETION, PLAYTIME, DATE]
            .iter()
            .any(|suffix| self.contains(&Self::slot_key(prefix, slot, suffix)))
    }

    /// Read the slot's device metadata record (defaults where unset).
    pub fn slot_record(&self, prefix: &str, slot: SlotIndex) -> DeviceMetadataRecord {
        let date = self
            .get_str(&Self::slot_key(prefix, slot, DATE))
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        DeviceMetadataRecord {
            completion_percent: self
                .get_f64(&Self::slot_key(prefix, slot, COMPLETION))
                .unwrap_or(0.0) as f32,
            playtime_seconds: self
                .get_f64(&Self::slot_key(prefix, slot, PLAYTIME))
                .unwrap_or(0.0),
            last_quit_utc: date,
            regression_flag: self
                .get_bool(&Self::slot_key(prefix, slot, REGRESSION_FLAG))
                .unwrap_or(false),
            regression_info: self
                .get_str(&Self::slot_key(prefix, slot, REGRESSION_INFO))
                .unwrap_or_default(),
        }
    }

    /// Overwrite the slot's device metadata record.
    pub fn set_slot_record(&self, prefix: &str, slot: SlotIndex, record: &DeviceMetadataRecord) {
        {
            let mut map = self.map.lock();
            map.insert(
                Self::slot_key(prefix, slot, COMPLETION),
                Value::from(record.completion_percent as f64),
            );
            map.insert(
                Self::slot_key(prefix, slot, PLAYTIME),
                Value::from(record.playtime_seconds),
            );
            match record.last_quit_utc {
                Some(ts) => {
                    map.insert(Self::slot_key(prefix, slot, DATE), Value::from(ts.to_rfc3339()));
                }
                None => {
                    map.remove(&Self::slot_key(prefix, slot, DATE));
                }
            }
            map.insert(
                Self::slot_key(prefix, slot, REGRESSION_FLAG),
                Value::from(record.regression_flag),
            );
            map.insert(
                Self::slot_key(prefix, slot, REGRESSION_INFO),
                Value::from(record.regression_info.clone()),
            );
        }
        self.flush();
    }

    /// Copy a slot record between key prefixes (prerelease migration).
    /// Only the summary fields move; regression state does not.
    pub fn copy_slot_record(&self, from_prefix: &str, to_prefix: &str, slot: SlotIndex) {
        let record = self.slot_record(from_prefix, slot);
        let sanitized = DeviceMetadataRecord {
            regression_flag: false,
            regression_info: String::new(),
            ..record
        };
        self.set_slot_record(to_prefix, slot, &sanitized);
    }

    // ========================================================================
    // Intentional-delete markers
    // ========================================================================

    /// Whether the slot was wiped on purpose (suppresses probe/migration).
    pub fn is_slot_deleted(&self, prefix: &str, slot: SlotIndex) -> bool {
        self.get_bool(&Self::slot_key(prefix, slot, DELETED))
            .unwrap_or(false)
    }

    /// Mark the slot as intentionally deleted.
    pub fn mark_slot_deleted(&self, prefix: &str, slot: SlotIndex) {
        self.set(&Self::slot_key(prefix, slot, DELETED), Value::from(true));
    }

    /// Clear the deleted marker (after the first successful save).
    pub fn clear_slot_deleted(&self, prefix: &str, slot: SlotIndex) {
        self.remove(&Self::slot_key(prefix, slot, DELETED));
    }
}

impl std::fmt::Debug for PrefStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefStore")
            .field("path", &self.path)
            .field("keys", &self.map.lock().len())
            .finish()
    }
}
