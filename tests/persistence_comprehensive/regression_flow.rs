//! End-to-end regression detection and the keep/restore decision flow.
//!
//! A rollback is simulated with real files: save the older state, stash
//! its canonical bytes, save the newer state (which the device metadata
//! record remembers), then put the older bytes back.

use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use keepsake::{LoadOutcome, RegressionDecision, RegressionReason};
use tempfile::TempDir;

use crate::test_utils::{fixture, reopen, GameData};

fn canonical(dir: &TempDir) -> PathBuf {
    dir.path().join("Saves").join("Save1").join("snapshot.bin")
}

#[test]
fn playtime_rollback_is_flagged_and_backup_restore_recovers() {
    let (dir, mgr) = fixture();

    assert!(mgr.save(&GameData::sample(300.0)));
    let stash = fs::read(canonical(&dir)).unwrap();

    thread::sleep(Duration::from_millis(5));
    assert!(mgr.save_and_archive(&GameData::sample(1000.0)));

    // The snapshot on disk rolls back to 300s while the device record
    // still remembers 1000s.
    fs::write(canonical(&dir), &stash).unwrap();

    let loaded = match mgr.load() {
        LoadOutcome::Loaded { state, regression } => {
            let report = regression.expect("rollback past tolerance must be flagged");
            assert_eq!(report.primary(), Some(RegressionReason::PlaytimeDrop));
            assert_eq!(report.playtime_drop_seconds, 700.0);
            state
        }
        other => panic!("expected Loaded, got {other:?}"),
    };
    assert_eq!(loaded.playtime_seconds, 300.0);

    // Restoring picks the newest backup (the 1000s archive) and reloads
    // clean: the record and the restored snapshot agree again.
    let outcome = mgr
        .resolve_regression(RegressionDecision::RestoreBackup, &loaded)
        .expect("restore returns a reload outcome");
    match outcome {
        LoadOutcome::Loaded { state, regression } => {
            assert_eq!(state.playtime_seconds, 1000.0);
            assert!(regression.is_none());
        }
        other => panic!("expected Loaded, got {other:?}"),
    }
}

#[test]
fn drop_within_tolerance_is_not_flagged() {
    let (dir, mgr) = fixture();

    assert!(mgr.save(&GameData::sample(950.0)));
    let stash = fs::read(canonical(&dir)).unwrap();
    assert!(mgr.save(&GameData::sample(1000.0)));
    fs::write(canonical(&dir), &stash).unwrap();

    match mgr.load() {
        LoadOutcome::Loaded { state, regression } => {
            assert_eq!(state.playtime_seconds, 950.0);
            assert!(regression.is_none());
        }
        other => panic!("expected Loaded, got {other:?}"),
    }
}

#[test]
fn stale_quit_stamp_past_grace_is_flagged() {
    let (dir, mgr) = fixture();

    let mut old = GameData::sample(500.0);
    old.date_quit = Some(Utc::now() - ChronoDuration::minutes(30));
    let new = GameData::sample(500.0); // quit stamp is now

    assert!(mgr.save(&old));
    let stash = fs::read(canonical(&dir)).unwrap();
    assert!(mgr.save(&new));
    fs::write(canonical(&dir), &stash).unwrap();

    match mgr.load() {
        LoadOutcome::Loaded { regression, .. } => {
            let report = regression.expect("30 min stale stamp exceeds the 10 min grace");
            assert_eq!(report.primary(), Some(RegressionReason::OlderThanLastSeen));
            assert!(report.minutes_newer_previously >= 29);
        }
        other => panic!("expected Loaded, got {other:?}"),
    }
}

#[test]
fn keep_loaded_silences_the_flag_across_reopen() {
    let (dir, mgr) = fixture();

    assert!(mgr.save(&GameData::sample(100.0)));
    let stash = fs::read(canonical(&dir)).unwrap();
    assert!(mgr.save(&GameData::sample(5000.0)));
    fs::write(canonical(&dir), &stash).unwrap();

    let loaded = match mgr.load() {
        LoadOutcome::Loaded { state, regression } => {
            assert!(regression.is_some());
            state
        }
        other => panic!("expected Loaded, got {other:?}"),
    };
    assert!(mgr
        .resolve_regression(RegressionDecision::KeepLoaded, &loaded)
        .is_none());
    drop(mgr);

    // A fresh process sees the accepted state as the new baseline.
    let mgr = reopen(&dir);
    match mgr.load() {
        LoadOutcome::Loaded { regression, .. } => assert!(regression.is_none()),
        other => panic!("expected Loaded, got {other:?}"),
    }
}
