//! Per-installation signing key.
//!
//! Created once, stored base64-encoded outside any slot directory, and
//! cached immutable for the life of the process. If the key file cannot
//! be read or written, the store degrades to an ephemeral in-memory key
//! rather than failing hard: saves made under an ephemeral key will not
//! verify on a later run, which is accepted.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::RngCore;
use tracing::warn;

/// Length of the MAC key in bytes.
pub const KEY_LEN: usize = 32;

/// A 32-byte MAC key. No rotation, no multi-key support.
#[derive(Clone)]
pub struct SigningKey {
    bytes: [u8; KEY_LEN],
    ephemeral: bool,
}

impl SigningKey {
    /// Load the installation key, creating it on first run.
    ///
    /// Never fails: any read/write problem falls back to an ephemeral
    /// key for this process run.
    pub fn load_or_create(path: &Path) -> Self {
        if let Some(key) = Self::try_read(path) {
            return key;
        }

        let bytes = Self::random_bytes();
        if let Err(err) = Self::try_write(path, &bytes) {
            warn!(path = %path.display(), %err, "could not persist signing key; using ephemeral key");
            return Self {
                bytes,
                ephemeral: true,
            };
        }
        Self {
            bytes,
            ephemeral: false,
        }
    }

    /// Key material for MAC computation.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Whether this key exists only in memory for this process run.
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    fn try_read(path: &Path) -> Option<Self> {
        let text = fs::read_to_string(path).ok()?;
        let decoded = match BASE64.decode(text.trim()) {
            Ok(d) => d,
            Err(err) => {
                warn!(path = %path.display(), %err, "signing key file is corrupt; regenerating");
                return None;
            }
        };
        let bytes: [u8; KEY_LEN] = decoded.try_into().ok()?;
        Some(Self {
            bytes,
            ephemeral: false,
        })
    }

    fn try_write(path: &Path, bytes: &[u8; KEY_LEN]) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, BASE64.encode(bytes))
    }

    fn random_bytes() -> [u8; KEY_LEN] {
        let mut bytes = [0u8; KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        bytes
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material never appears in logs.
        f.debug_struct("SigningKey")
            .field("ephemeral", &self.ephemeral)
            .finish()
    }
}
