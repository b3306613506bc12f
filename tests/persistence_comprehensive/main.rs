//! Comprehensive persistence test suite.
//!
//! Exercises the full save engine through the public facade, plus the
//! storage internals where a scenario needs to damage files on disk.
//!
//! ## Test areas
//!
//! - `atomicity`: interrupted writes and cancellation never lose data
//! - `round_trip`: codec and save/load equivalence (property-based)
//! - `tamper`: single-byte corruption is detected and falls back
//! - `rotation`: generation count stays bounded
//! - `regression_flow`: detection thresholds and the keep/restore choice
//! - `migration`: one-shot legacy migrations and key-fallback discovery
//!
//! ## Running
//!
//! ```bash
//! cargo test --test persistence_comprehensive
//! ```

mod test_utils;

mod atomicity;
mod migration;
mod regression_flow;
mod rotation;
mod tamper;
