//! Interrupted-write and cancellation scenarios.
//!
//! The invariant: at every point where the process could be killed, a
//! subsequent load returns the previous valid snapshot, never a torn one.

use std::fs;

use keepsake::{CancelToken, LoadOutcome, SaveError, SlotPaths};

use crate::test_utils::{fixture, reopen, GameData};

#[test]
fn unconsumed_temp_file_does_not_shadow_canonical() {
    let (dir, mgr) = fixture();
    let state = GameData::sample(500.0);
    assert!(mgr.save(&state));

    // Simulate a kill after the temp write but before the rename: a
    // stray temp file sits next to a valid canonical snapshot.
    let slot_dir = dir.path().join("Saves").join("Save1");
    let paths = SlotPaths::in_dir(&slot_dir);
    fs::write(&paths.temp, b"partially written snapshot").unwrap();

    let mgr = reopen(&dir);
    match mgr.load() {
        LoadOutcome::Loaded { state: loaded, .. } => assert_eq!(loaded, state),
        other => panic!("expected previous snapshot, got {other:?}"),
    }
}

#[test]
fn truncated_canonical_falls_back_to_previous_save() {
    let (dir, mgr) = fixture();
    let first = GameData::sample(100.0);
    let second = GameData::sample(200.0);
    assert!(mgr.save(&first));
    assert!(mgr.save(&second));

    // Truncate canonical mid-file, as a torn write would.
    let canonical = dir.path().join("Saves").join("Save1").join("snapshot.bin");
    let bytes = fs::read(&canonical).unwrap();
    fs::write(&canonical, &bytes[..bytes.len() / 2]).unwrap();

    match mgr.load() {
        LoadOutcome::Loaded { state, .. } => assert_eq!(state, first),
        other => panic!("expected fallback to prev1, got {other:?}"),
    }
}

#[test]
fn cancelled_save_reports_cancelled_and_keeps_previous() {
    let (dir, mgr) = fixture();
    let state = GameData::sample(100.0);
    assert!(mgr.save(&state));

    let canonical = dir.path().join("Saves").join("Save1").join("snapshot.bin");
    let before = fs::read(&canonical).unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();
    let err = mgr
        .save_with(&GameData::sample(999.0), &cancel)
        .unwrap_err();
    assert!(matches!(err, SaveError::Cancelled));
    assert_eq!(fs::read(&canonical).unwrap(), before);
}

#[test]
fn failed_save_never_leaves_temp_files_behind() {
    let (dir, mgr) = fixture();
    assert!(mgr.save(&GameData::sample(1.0)));

    let cancel = CancelToken::new();
    cancel.cancel();
    let _ = mgr.save_with(&GameData::sample(2.0), &cancel);

    let temp = dir.path().join("Saves").join("Save1").join("snapshot.tmp");
    assert!(!temp.exists());
}
