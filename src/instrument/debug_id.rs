//! Content-addressed debug identifiers
//!
//! A debug ID is a SHA-256 digest of an artifact's final bytes, truncated to 128 bits and
//! laid out as a UUID. File names, paths and build order never feed into it.

use crate::core::error::{BundleError, BundleResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// 128-bit identifier derived from artifact content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DebugId([u8; 16]);

impl DebugId {
  /// Derive the identifier for a byte sequence
  pub fn from_content(content: &[u8]) -> Self {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let digest = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    // version 4, RFC 4122 variant
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    Self(bytes)
  }

  /// Raw bytes
  pub fn as_bytes(&self) -> &[u8; 16] {
    &self.0
  }
}

impl fmt::Display for DebugId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, byte) in self.0.iter().enumerate() {
      if matches!(i, 4 | 6 | 8 | 10) {
        f.write_str("-")?;
      }
      write!(f, "{:02x}", byte)?;
    }
    Ok(())
  }
}

impl FromStr for DebugId {
  type Err = BundleError;

  fn from_str(s: &str) -> BundleResult<Self> {
    let groups: Vec<&str> = s.split('-').collect();
    let lengths: Vec<usize> = groups.iter().map(|g| g.len()).collect();
    if lengths != [8, 4, 4, 4, 12] {
      return Err(BundleError::message(format!("Malformed debug ID '{}'", s)));
    }

    let hex: String = groups.concat();
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
      return Err(BundleError::message(format!("Malformed debug ID '{}'", s)));
    }

    let mut bytes = [0u8; 16];
    for (i, byte) in bytes.iter_mut().enumerate() {
      *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
        .map_err(|_| BundleError::message(format!("Malformed debug ID '{}'", s)))?;
    }
    Ok(Self(bytes))
  }
}

impl TryFrom<String> for DebugId {
  type Error = BundleError;

  fn try_from(value: String) -> BundleResult<Self> {
    value.parse()
  }
}

impl From<DebugId> for String {
  fn from(id: DebugId) -> Self {
    id.to_string()
  }
}
