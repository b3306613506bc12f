//! Orchestration layer of the Keepsake save engine.
//!
//! - `manager`: the [`SlotManager`], sole owner of save/load/slot-switch
//! - `regression`: compares loaded snapshots against device metadata
//! - `autosave`: interval policy the host polls from its update loop

pub mod autosave;
pub mod manager;
pub mod regression;

pub use autosave::AutosavePolicy;
pub use manager::{LoadOutcome, RegressionDecision, SlotManager, SlotPhase};
pub use regression::detect_regression;
