//! Content hashing for write-once records

use crate::errors::{Result, SaiError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 32-byte BLAKE3 digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash32([u8; 32]);

impl Hash32 {
    /// Hash a byte slice
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Hash content together with a discriminator.
    ///
    /// The content is length-prefixed, so moving bytes between the two inputs
    /// always changes the digest.
    pub fn from_content(content: &[u8], discriminator: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(content.len() as u64).to_le_bytes());
        hasher.update(content);
        hasher.update(discriminator);
        Self(*hasher.finalize().as_bytes())
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex digest
    pub fn from_hex(value: &str) -> Result<Self> {
        let bytes = hex::decode(value)
            .map_err(|e| SaiError::invalid(format!("Invalid hex digest '{value}': {e}")))?;
        let digest: [u8; 32] = bytes
            .try_into()
            .map_err(|_| SaiError::invalid(format!("Digest '{value}' is not 32 bytes")))?;
        Ok(Self(digest))
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
