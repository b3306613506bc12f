//! Shared fixtures for the persistence suite.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use keepsake::{SaveState, SlotManager, SlotSummary, StoreConfig};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

/// A representative game-state payload: nested collections, floats, and
/// the summary fields the engine cares about.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameData {
    pub playtime_seconds: f64,
    pub completion_percent: f32,
    pub date_quit: Option<DateTime<Utc>>,
    pub resources: BTreeMap<String, f64>,
    pub completed_quests: Vec<String>,
    pub skill_levels: BTreeMap<String, u32>,
}

impl SaveState for GameData {
    const SCHEMA_VERSION: u32 = 3;

    fn summary(&self) -> SlotSummary {
        SlotSummary {
            completion_percent: self.completion_percent,
            playtime_seconds: self.playtime_seconds,
            last_quit_utc: self.date_quit,
        }
    }
}

impl GameData {
    /// A non-trivial state for round-trip assertions.
    pub fn sample(playtime: f64) -> Self {
        let mut resources = BTreeMap::new();
        resources.insert("gold".to_string(), 1234.5);
        resources.insert("lumber".to_string(), 99.0);
        let mut skill_levels = BTreeMap::new();
        skill_levels.insert("mining".to_string(), 17);
        Self {
            playtime_seconds: playtime,
            completion_percent: 33.3,
            date_quit: Some(Utc::now()),
            resources,
            completed_quests: vec!["tutorial".into(), "first_contract".into()],
            skill_levels,
        }
    }
}

/// A manager rooted in a fresh temp directory.
pub fn fixture() -> (TempDir, SlotManager<GameData>) {
    init_tracing();
    let dir = TempDir::new().expect("temp dir");
    let mgr = SlotManager::open(StoreConfig::new(dir.path(), "test-build"));
    (dir, mgr)
}

/// Route engine logs through the test harness's captured output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A manager over an existing root (reopening the same store).
pub fn reopen(dir: &TempDir) -> SlotManager<GameData> {
    SlotManager::open(StoreConfig::new(dir.path(), "test-build"))
}
