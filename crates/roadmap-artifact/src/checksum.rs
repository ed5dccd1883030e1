//! Rendered-HTML checksums
//!
//! Provides [`Checksum`], a strongly-typed 32-byte digest of an exact
//! rendered HTML string. It is a write-time fingerprint used to detect drift
//! between client-held HTML and the last known-good render. It is never a
//! security boundary.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Length of a checksum in hex characters
pub const CHECKSUM_HEX_LEN: usize = 64;

/// A 32-byte digest (Blake3) of rendered HTML
///
/// Order-sensitive: any single-character change in the input changes the
/// digest. Immutable and cheap to clone (Copy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Checksum([u8; 32]);

impl Checksum {
    /// Compute the checksum of an HTML string (UTF-8 bytes, exactly as given)
    #[inline]
    #[must_use]
    pub fn of(html: &str) -> Self {
        Self(*blake3::hash(html.as_bytes()).as_bytes())
    }

    /// Check whether `html` still matches this checksum
    #[inline]
    #[must_use]
    pub fn matches(&self, html: &str) -> bool {
        Self::of(html) == *self
    }

    /// Short string representation (first 16 hex chars), for logs
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }

    /// Create checksum from byte slice
    ///
    /// # Errors
    /// Returns error if slice length is not exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ChecksumError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| ChecksumError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl Display for Checksum {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Checksum {
    type Err = ChecksumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim())?;
        Self::from_slice(&bytes)
    }
}

impl serde::Serialize for Checksum {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Checksum {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when parsing checksums
#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    /// Invalid digest length
    #[error("invalid checksum length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Hex decoding error
    #[error("checksum is not valid hex: {0}")]
    HexDecode(#[from] hex::FromHexError),
}
