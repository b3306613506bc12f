//! Self-describing integrity header framing every snapshot.
//!
//! Wire layout (little-endian), in the exact order the MAC is computed:
//!
//! ```text
//! magic            4 bytes  "KSAV"
//! schema_version   u32
//! timestamp_utc    i64      unix milliseconds
//! build_id len     u16
//! build_id         UTF-8 bytes
//! payload_size     u32
//! --- everything above is the unsigned prefix the MAC covers ---
//! signature len    u16
//! signature        bytes (32 for the keyed MAC)
//! ```
//!
//! `decode` works entirely from bytes read off disk, before any signature
//! check, and reports how many bytes the header consumed so the caller
//! can split off the payload. The MAC covers the unsigned prefix and the
//! payload jointly, so neither can be swapped independently.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use chrono::{DateTime, TimeZone, Utc};
use keepsake_core::SnapshotReadError;

use crate::secret::SigningKey;

const MAGIC: &[u8; 4] = b"KSAV";

/// Length of the keyed-MAC signature in bytes.
pub const SIGNATURE_LEN: usize = 32;

/// Smallest possible encoded header (empty build id, empty signature).
pub const MIN_HEADER_LEN: usize = 4 + 4 + 8 + 2 + 4 + 2;

/// Fixed-format record framing every snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrityHeader {
    /// Payload schema version.
    pub schema_version: u32,
    /// UTC time the snapshot was written (millisecond precision).
    pub timestamp_utc: DateTime<Utc>,
    /// Build identifier of the writer.
    pub build_id: String,
    /// Payload length in bytes.
    pub payload_size: u32,
    /// Keyed MAC over the unsigned header prefix and the payload.
    pub signature: Vec<u8>,
}

impl IntegrityHeader {
    /// Build an unsigned header for a payload about to be written.
    pub fn new(schema_version: u32, now: DateTime<Utc>, build_id: &str, payload_len: usize) -> Self {
        Self {
            schema_version,
            timestamp_utc: now,
            build_id: build_id.to_string(),
            payload_size: payload_len as u32,
            signature: Vec::new(),
        }
    }

    /// Encode the unsigned prefix: every field except the signature, in
    /// the exact byte sequence the MAC is computed over.
    pub fn encode_unsigned(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MIN_HEADER_LEN + self.build_id.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&self.schema_version.to_le_bytes());
        out.extend_from_slice(&self.timestamp_utc.timestamp_millis().to_le_bytes());
        let build = self.build_id.as_bytes();
        out.extend_from_slice(&(build.len() as u16).to_le_bytes());
        out.extend_from_slice(build);
        out.extend_from_slice(&self.payload_size.to_le_bytes());
        out
    }

    /// Encode the full header, signature included.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.encode_unsigned();
        out.extend_from_slice(&(self.signature.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.signature);
        out
    }

    /// Decode a header from the front of `bytes`.
    ///
    /// Returns the header and the number of bytes it consumed; the
    /// remainder of `bytes` is the payload.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), SnapshotReadError> {
        if bytes.len() < MIN_HEADER_LEN {
            return Err(SnapshotReadError::Header("file shorter than header".into()));
        }

        let mut cursor = Cursor::new(bytes);
        let mut magic = [0u8; 4];
        cursor
            .read_exact(&mut magic)
            .map_err(|e| SnapshotReadError::Header(e.to_string()))?;
        if &magic != MAGIC {
            return Err(SnapshotReadError::Header("bad magic".into()));
        }

        let schema_version = cursor
            .read_u32::<LittleEndian>()
            .map_err(|e| SnapshotReadError::Header(e.to_string()))?;
        let millis = cursor
            .read_i64::<LittleEndian>()
            .map_err(|e| SnapshotReadError::Header(e.to_string()))?;
        let timestamp_utc = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| SnapshotReadError::Header("timestamp out of range".into()))?;

        let build_len = cursor
            .read_u16::<LittleEndian>()
            .map_err(|e| SnapshotReadError::Header(e.to_string()))? as usize;
        let mut build_bytes = vec![0u8; build_len];
        cursor
            .read_exact(&mut build_bytes)
            .map_err(|e| SnapshotReadError::Header(e.to_string()))?;
        let build_id = String::from_utf8(build_bytes)
            .map_err(|e| SnapshotReadError::Header(e.to_string()))?;

        let payload_size = cursor
            .read_u32::<LittleEndian>()
            .map_err(|e| SnapshotReadError::Header(e.to_string()))?;

        let sig_len = cursor
            .read_u16::<LittleEndian>()
            .map_err(|e| SnapshotReadError::Header(e.to_string()))? as usize;
        let mut signature = vec![0u8; sig_len];
        cursor
            .read_exact(&mut signature)
            .map_err(|e| SnapshotReadError::Header(e.to_string()))?;

        let consumed = cursor.position() as usize;
        Ok((
            Self {
                schema_version,
                timestamp_utc,
                build_id,
                payload_size,
                signature,
            },
            consumed,
        ))
    }

    /// Length of the unsigned prefix within an encoded header of length
    /// `header_len`.
    fn unsigned_len(&self, header_len: usize) -> usize {
        header_len - 2 - self.signature.len()
    }
}

/// Compute the keyed MAC over the unsigned header prefix and the payload.
pub fn compute_mac(key: &SigningKey, unsigned_header: &[u8], payload: &[u8]) -> [u8; SIGNATURE_LEN] {
    let mut hasher = blake3::Hasher::new_keyed(key.as_bytes());
    hasher.update(unsigned_header);
    hasher.update(payload);
    *hasher.finalize().as_bytes()
}

/// Decode, verify, and split a whole snapshot file.
///
/// On success returns the header and the payload slice. The signature
/// check recomputes the MAC over the exact bytes read off disk and
/// compares in constant time ([`blake3::Hash`] equality).
pub fn verify_and_split<'a>(
    key: &SigningKey,
    bytes: &'a [u8],
) -> Result<(IntegrityHeader, &'a [u8]), SnapshotReadError> {
    let (header, header_len) = IntegrityHeader::decode(bytes)?;
    if header.signature.len() != SIGNATURE_LEN {
        return Err(SnapshotReadError::MacMismatch);
    }

    let payload = &bytes[header_len..];
    if payload.len() != header.payload_size as usize {
        return Err(SnapshotReadError::Header(format!(
            "payload length {} does not match header {}",
            payload.len(),
            header.payload_size
        )));
    }

    let unsigned = &bytes[..header.unsigned_len(header_len)];
    let computed = blake3::Hash::from(compute_mac(key, unsigned, payload));
    let mut stored = [0u8; SIGNATURE_LEN];
    stored.copy_from_slice(&header.signature);
    if computed != blake3::Hash::from(stored) {
        return Err(SnapshotReadError::MacMismatch);
    }

    Ok((header, payload))
}

/// Encode a signed snapshot: header plus payload, ready to write.
pub fn encode_snapshot(
    key: &SigningKey,
    mut header: IntegrityHeader,
    payload: &[u8],
) -> Vec<u8> {
    let unsigned = header.encode_unsigned();
    header.signature = compute_mac(key, &unsigned, payload).to_vec();
    let mut out = header.encode();
    out.extend_from_slice(payload);
    out
}
