//! Generation rotation and archive retention bounds.

use std::fs;
use std::thread;
use std::time::Duration;

use keepsake::{SlotManager, SlotPaths, StoreConfig};
use keepsake_storage::{latest_archive, read_snapshot_file, SigningKey};
use tempfile::TempDir;

use crate::test_utils::{fixture, GameData};

#[test]
fn rotation_keeps_exactly_three_generations() {
    let (dir, mgr) = fixture();
    for i in 1..=5 {
        assert!(mgr.save(&GameData::sample(i as f64 * 100.0)));
    }

    let config = StoreConfig::new(dir.path(), "test-build");
    let key = SigningKey::load_or_create(&config.secret_path());
    let paths = SlotPaths::in_dir(dir.path().join("Saves").join("Save1"));

    let canonical: GameData = read_snapshot_file(&paths.canonical, &key).unwrap();
    let prev1: GameData = read_snapshot_file(&paths.prev1, &key).unwrap();
    let prev2: GameData = read_snapshot_file(&paths.prev2, &key).unwrap();
    assert_eq!(canonical.playtime_seconds, 500.0);
    assert_eq!(prev1.playtime_seconds, 400.0);
    assert_eq!(prev2.playtime_seconds, 300.0);

    // Nothing beyond the canonical layout accumulates in the slot dir.
    let mut names: Vec<String> = fs::read_dir(&paths.dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec!["meta.json", "snapshot.bin", "snapshot.prev1.bin", "snapshot.prev2.bin"]
    );
}

#[test]
fn two_saves_leave_prev2_absent() {
    let (dir, mgr) = fixture();
    assert!(mgr.save(&GameData::sample(1.0)));
    assert!(mgr.save(&GameData::sample(2.0)));

    let paths = SlotPaths::in_dir(dir.path().join("Saves").join("Save1"));
    assert!(paths.canonical.exists());
    assert!(paths.prev1.exists());
    assert!(!paths.prev2.exists());
}

#[test]
fn archives_are_pruned_to_retention_count() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig::new(dir.path(), "test-build").archives_to_keep(3);
    let mgr: SlotManager<GameData> = SlotManager::open(config);

    for i in 1..=5 {
        assert!(mgr.save_and_archive(&GameData::sample(i as f64)));
        // Archive names carry a millisecond stamp; keep them distinct.
        thread::sleep(Duration::from_millis(5));
    }

    let backups = dir
        .path()
        .join("Saves")
        .join("Backups")
        .join("Save1");
    let count = fs::read_dir(&backups).unwrap().count();
    assert_eq!(count, 3);

    // The newest archive reflects the last save.
    let key = SigningKey::load_or_create(
        &StoreConfig::new(dir.path(), "test-build").secret_path(),
    );
    let (newest, _) = latest_archive(&backups).unwrap();
    let state: GameData = read_snapshot_file(&newest, &key).unwrap();
    assert_eq!(state.playtime_seconds, 5.0);
}
