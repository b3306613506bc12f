//! Core types for the Keepsake save engine.
//!
//! This crate holds everything the storage and engine layers share:
//! slot identity, the [`SaveState`] contract the host's game-state type
//! implements, the error taxonomy, and tunable configuration.

pub mod config;
pub mod error;
pub mod types;

pub use config::{is_canonical_layout_name, RegressionTolerances, SlotPaths, StoreConfig};
pub use error::{LoadError, SaveError, SnapshotReadError};
pub use types::{
    BuildVariant, CancelToken, DeviceMetadataRecord, RegressionReason, RegressionReport,
    SaveState, SlotIndex, SlotSummary, SLOT_COUNT,
};
