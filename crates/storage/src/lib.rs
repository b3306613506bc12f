//! On-disk persistence layer for the Keepsake save engine.
//!
//! This crate owns everything that touches bytes on disk:
//!
//! - `secret`: per-installation signing key
//! - `codec`: opaque payload serialization
//! - `header`: self-describing integrity header with a keyed MAC
//! - `writer`: atomic snapshot writer with generation rotation
//! - `loader`: fallback loader with legacy key-probing
//! - `archive`: append-only timestamped backup copies
//! - `prefs`: flat key/value preference store (device metadata, markers)
//! - `migrate`: one-shot legacy migrations into the canonical layout

pub mod archive;
pub mod codec;
pub mod header;
pub mod loader;
pub mod migrate;
pub mod prefs;
pub mod secret;
pub mod writer;

pub use archive::{archive_snapshot, latest_archive};
pub use codec::{decode_payload, encode_payload};
pub use header::IntegrityHeader;
pub use loader::{load_generations, probe_legacy, read_snapshot_file, LegacyHit};
pub use migrate::migrate_if_needed;
pub use prefs::PrefStore;
pub use secret::SigningKey;
pub use writer::{peek_timestamp, write_snapshot};
