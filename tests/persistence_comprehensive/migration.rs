//! Legacy-file adoption at open time and probe fallback at load time.

use std::fs;
use std::path::Path;

use keepsake::{
    CancelToken, LoadOutcome, SaveState, SlotIndex, SlotManager, SlotPaths, StoreConfig,
};
use keepsake_storage::{encode_payload, write_snapshot, SigningKey};
use tempfile::TempDir;

use crate::test_utils::{fixture, reopen, GameData};

/// Write a signed snapshot under a legacy name in the saves root, using
/// the store's own signing key.
fn write_legacy(root: &Path, name: &str, state: &GameData) {
    let config = StoreConfig::new(root, "test-build");
    fs::create_dir_all(config.saves_dir()).unwrap();
    let key = SigningKey::load_or_create(&config.secret_path());

    let scratch = root.join("scratch");
    let paths = SlotPaths::in_dir(&scratch);
    let payload = encode_payload(state).unwrap();
    write_snapshot(
        &paths,
        &key,
        GameData::SCHEMA_VERSION,
        "test-build",
        &payload,
        &CancelToken::new(),
    )
    .unwrap();
    fs::rename(&paths.canonical, config.saves_dir().join(name)).unwrap();
    fs::remove_dir_all(&scratch).unwrap();
}

#[test]
fn legacy_file_is_adopted_into_named_slot_on_open() {
    let dir = TempDir::new().unwrap();
    let legacy = GameData::sample(4242.0);
    write_legacy(dir.path(), "Sd1.sav", &legacy);

    let mgr: SlotManager<GameData> =
        SlotManager::open(StoreConfig::new(dir.path(), "test-build"));

    let slot = SlotIndex::new(1).unwrap();
    match mgr.select_slot(slot, &GameData::default()) {
        LoadOutcome::Loaded { state, .. } => assert_eq!(state, legacy),
        other => panic!("expected adopted legacy save, got {other:?}"),
    }
}

#[test]
fn adoption_runs_once_per_installation() {
    let dir = TempDir::new().unwrap();
    write_legacy(dir.path(), "Sd0.sav", &GameData::sample(10.0));

    let mgr = reopen(&dir);
    drop(mgr);

    let canonical = dir.path().join("Saves").join("Save1").join("snapshot.bin");
    let adopted_bytes = fs::read(&canonical).unwrap();

    // The legacy source changes, but the migration marker is set: a
    // second open must not copy again.
    fs::remove_file(dir.path().join("Saves").join("Sd0.sav")).unwrap();
    write_legacy(dir.path(), "Sd0.sav", &GameData::sample(99999.0));
    let mgr = reopen(&dir);
    drop(mgr);

    assert_eq!(fs::read(&canonical).unwrap(), adopted_bytes);
}

#[test]
fn probe_fallback_re_persists_so_later_loads_skip_it() {
    let (dir, mgr) = fixture();

    // The legacy file appears after open, past the one-shot migration.
    let legacy = GameData::sample(123.0);
    write_legacy(dir.path(), "Sd0.sav", &legacy);

    match mgr.load() {
        LoadOutcome::Loaded { state, .. } => assert_eq!(state, legacy),
        other => panic!("probe should discover the legacy file, got {other:?}"),
    }

    // The probe re-persisted canonically; the legacy file is no longer
    // needed.
    let canonical = dir.path().join("Saves").join("Save1").join("snapshot.bin");
    assert!(canonical.exists());
    fs::remove_file(dir.path().join("Saves").join("Sd0.sav")).unwrap();

    match mgr.load() {
        LoadOutcome::Loaded { state, .. } => assert_eq!(state, legacy),
        other => panic!("expected canonical load, got {other:?}"),
    }
}

#[test]
fn wiped_slot_is_not_resurrected_by_the_probe() {
    let (dir, mgr) = fixture();
    assert!(mgr.save(&GameData::sample(50.0)));

    let slot = mgr.current_slot();
    mgr.wipe_slot(slot);
    write_legacy(dir.path(), "Sd0.sav", &GameData::sample(50.0));

    match mgr.load() {
        LoadOutcome::Fresh { notice, .. } => assert!(notice.is_none()),
        other => panic!("wiped slot must stay fresh, got {other:?}"),
    }
}
