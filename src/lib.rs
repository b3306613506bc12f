//! Keepsake: crash-safe, tamper-evident save-slot persistence for games.
//!
//! The engine turns one serializable game-state value per slot into a
//! signed snapshot on disk, recovers it across backup generations and
//! legacy naming schemes, and flags loads that look suspiciously older
//! than what the device last observed.
//!
//! # Example
//!
//! ```ignore
//! use keepsake::{SlotManager, StoreConfig, SaveState, SlotSummary, LoadOutcome};
//!
//! #[derive(Default, serde::Serialize, serde::Deserialize)]
//! struct GameData { playtime: f64 }
//!
//! impl SaveState for GameData {
//!     const SCHEMA_VERSION: u32 = 1;
//!     fn summary(&self) -> SlotSummary {
//!         SlotSummary { playtime_seconds: self.playtime, ..Default::default() }
//!     }
//! }
//!
//! let manager: SlotManager<GameData> =
//!     SlotManager::open(StoreConfig::new("/path/to/persistent-data", "1.4.2"));
//! let outcome = manager.load();
//! # let _ = outcome;
//! ```
//!
//! All operations are synchronous; the host drives autosave by polling
//! [`AutosavePolicy`] from its update loop and calling
//! [`SlotManager::save_and_archive`].

pub mod types;

pub use types::*;
