//! SHA-256 fingerprints over canonical text.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::determinism::{CanonicalError, to_canonical_string};

/// Size of a SHA-256 digest in bytes.
pub const HASH_SIZE: usize = 32;

/// Type alias for a raw 32-byte digest.
pub type Hash = [u8; HASH_SIZE];

/// Errors that can occur when parsing a hex digest.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashHexError {
    /// The string is not 64 characters long.
    #[error("invalid hash length: expected {expected} hex chars, got {actual}")]
    InvalidLength {
        /// Required length.
        expected: usize,
        /// Length found.
        actual: usize,
    },

    /// The string contains something other than lowercase hex digits.
    #[error("invalid hash encoding: '{value}' is not lowercase hex")]
    InvalidEncoding {
        /// The rejected string.
        value: String,
    },
}

/// A SHA-256 digest rendered as 64 lowercase hex characters.
///
/// Construction always validates the encoding, so two equal digests are
/// always equal strings.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HashHex(String);

impl HashHex {
    /// Renders raw digest bytes.
    #[must_use]
    pub fn from_bytes(bytes: &Hash) -> Self {
        Self(hex::encode(bytes))
    }

    /// Parses and validates a hex digest.
    ///
    /// # Errors
    ///
    /// Returns [`HashHexError`] if the string is not exactly 64 lowercase hex
    /// characters.
    pub fn parse(value: &str) -> Result<Self, HashHexError> {
        let expected = HASH_SIZE * 2;
        if value.len() != expected {
            return Err(HashHexError::InvalidLength {
                expected,
                actual: value.len(),
            });
        }
        if !value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return Err(HashHexError::InvalidEncoding {
                value: value.to_string(),
            });
        }
        Ok(Self(value.to_string()))
    }

    /// Returns the hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes back to raw digest bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Hash {
        let mut out = [0u8; HASH_SIZE];
        // Validated at construction; decode cannot fail.
        let _ = hex::decode_to_slice(&self.0, &mut out);
        out
    }
}

impl fmt::Debug for HashHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashHex({})", self.0)
    }
}

impl fmt::Display for HashHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for HashHex {
    type Error = HashHexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HashHex> for String {
    fn from(value: HashHex) -> Self {
        value.0
    }
}

impl AsRef<str> for HashHex {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Computes a raw SHA-256 digest.
#[must_use]
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// Computes the hex SHA-256 digest of a UTF-8 string.
#[must_use]
pub fn sha256_hex(data: &str) -> HashHex {
    HashHex::from_bytes(&sha256(data.as_bytes()))
}

/// Computes `SHA-256(canonical(value))`.
///
/// # Errors
///
/// Returns [`CanonicalError`] if the value has no canonical form.
pub fn canonical_hash<T>(value: &T) -> Result<HashHex, CanonicalError>
where
    T: ?Sized + Serialize,
{
    to_canonical_string(value).map(|canonical| sha256_hex(&canonical))
}
