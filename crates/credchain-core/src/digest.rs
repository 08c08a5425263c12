//! # Credential Hash
//!
//! Defines `CredentialHash`, the 32-byte Keccak-256 digest that identifies a
//! credential on the ledger.
//!
//! ## Invariant
//!
//! A `CredentialHash` for a credential can only be computed from
//! `CanonicalBytes`. This is enforced by the signature of
//! [`keccak256_digest()`]. Hashes read back from the ledger or supplied by a
//! caller enter through [`CredentialHash::from_bytes`] or `FromStr`, which
//! never touch credential content.
//!
//! ## Text form
//!
//! `0x` followed by 64 lowercase hex characters. Parsing accepts either case
//! so that comparisons against checksummed or upper-cased producers are
//! case-insensitive.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use crate::canonical::CanonicalBytes;
use crate::error::{CanonicalizationError, HexError};
use crate::value::CredentialValue;

/// Prefix of the textual hash form.
pub const HASH_PREFIX: &str = "0x";

/// A Keccak-256 credential content hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CredentialHash([u8; 32]);

impl CredentialHash {
    /// Wrap raw digest bytes, e.g. a `bytes32` word read from the ledger.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw 32 digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render as `0x` + lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("{HASH_PREFIX}{}", hex::encode(self.0))
    }

    /// Case-insensitive comparison against a textual hash.
    ///
    /// Returns `false` for text that is not a well-formed hash.
    pub fn matches_hex(&self, text: &str) -> bool {
        text.parse::<CredentialHash>()
            .map(|other| other == *self)
            .unwrap_or(false)
    }
}

impl fmt::Display for CredentialHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CredentialHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CredentialHash({})", self.to_hex())
    }
}

impl FromStr for CredentialHash {
    type Err = HexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(decode_prefixed::<32>(s)?))
    }
}

impl Serialize for CredentialHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for CredentialHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Compute the Keccak-256 credential hash of canonical bytes.
///
/// Accepts only `&CanonicalBytes`, not raw `&[u8]`, so every credential hash
/// in the system is taken over the canonical form.
pub fn keccak256_digest(data: &CanonicalBytes) -> CredentialHash {
    CredentialHash(keccak256(data.as_bytes()))
}

/// Canonicalize a credential and hash the result.
///
/// # Errors
///
/// Propagates any [`CanonicalizationError`]; no default hash is substituted.
pub fn credential_hash(
    value: &CredentialValue,
) -> Result<(CanonicalBytes, CredentialHash), CanonicalizationError> {
    let canonical = CanonicalBytes::new(value)?;
    let hash = keccak256_digest(&canonical);
    Ok((canonical, hash))
}

/// Raw Keccak-256 over arbitrary bytes.
///
/// Used for ABI function selectors and address derivation, never for
/// credential content.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

/// Decode `0x`-prefixed hex of exactly `N` bytes, any case.
pub(crate) fn decode_prefixed<const N: usize>(s: &str) -> Result<[u8; N], HexError> {
    let body = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| HexError::MissingPrefix(s.to_string()))?;
    if body.len() != N * 2 {
        return Err(HexError::WrongLength {
            expected: N * 2,
            actual: body.len(),
        });
    }
    let mut out = [0u8; N];
    hex::decode_to_slice(body, &mut out).map_err(|_| HexError::InvalidHex(s.to_string()))?;
    Ok(out)
}
