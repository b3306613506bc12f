//! Public types for the Keepsake unified API.
//!
//! This module re-exports types from internal crates with a clean public
//! interface.

// ============================================================================
// Public API types - these are what users should use
// ============================================================================

// State contract and slot identity
pub use keepsake_core::{SaveState, SlotIndex, SlotSummary, SLOT_COUNT};

// Configuration
pub use keepsake_core::{BuildVariant, RegressionTolerances, StoreConfig};

// Errors and outcomes
pub use keepsake_core::{CancelToken, LoadError, SaveError, SlotPaths};
pub use keepsake_core::{DeviceMetadataRecord, RegressionReason, RegressionReport};

// Orchestration
pub use keepsake_engine::{
    AutosavePolicy, LoadOutcome, RegressionDecision, SlotManager, SlotPhase,
};

// On-disk format (exposed for diagnostic tooling)
pub use keepsake_storage::IntegrityHeader;
