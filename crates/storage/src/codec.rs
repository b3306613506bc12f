//! Opaque payload codec.
//!
//! The engine never interprets the payload beyond [`SaveState`]; it is a
//! bincode blob that must round-trip exactly. A structural mismatch on
//! decode surfaces as [`SnapshotReadError::Deserialize`], which the
//! fallback loader treats identically to a corrupt file.

use keepsake_core::{SaveError, SaveState, SnapshotReadError};

/// Serialize a state value to the snapshot payload bytes.
pub fn encode_payload<T: SaveState>(state: &T) -> Result<Vec<u8>, SaveError> {
    bincode::serialize(state).map_err(|err| SaveError::Encode(err.to_string()))
}

/// Deserialize snapshot payload bytes back into a state value.
pub fn decode_payload<T: SaveState>(bytes: &[u8]) -> Result<T, SnapshotReadError> {
    bincode::deserialize(bytes).map_err(|err| SnapshotReadError::Deserialize(err.to_string()))
}
