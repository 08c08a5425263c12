//! # credchain-core: Credential Integrity Primitives
//!
//! The integrity core of credchain: a closed credential value model, the
//! canonical serialization used as the hash preimage, and the Keccak-256
//! credential hash that identifies a credential on the ledger.
//!
//! ## Key Design Principles
//!
//! 1. **Closed value model.** Credentials are `CredentialValue` trees. Nothing
//!    outside the six JSON shapes can reach the canonicalizer.
//!
//! 2. **`CanonicalBytes` newtype.** ALL credential hashing flows through
//!    `CanonicalBytes::new()`. No raw `serde_json::to_vec()` for hashes.
//!
//! 3. **`keccak256_digest()` accepts only `&CanonicalBytes`.** Issuance and
//!    verification hash the same bytes by construction.
//!
//! 4. **Pinned number rendering.** Binary64 with ECMAScript formatting; see
//!    [`canonical`] for the full policy.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `credchain-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;
pub mod value;

pub use canonical::{CanonicalBytes, MAX_DEPTH, MAX_SAFE_INTEGER};
pub use digest::{credential_hash, keccak256, keccak256_digest, CredentialHash, HASH_PREFIX};
pub use error::{CanonicalizationError, CoreError, HexError, ParseError};
pub use identity::Address;
pub use temporal::Timestamp;
pub use value::CredentialValue;

/// Parse credential JSON text, canonicalize it, and hash it.
///
/// # Errors
///
/// [`CoreError::Parse`] for malformed text, [`CoreError::Canonicalization`]
/// when the parsed value falls outside the canonical policy.
pub fn hash_credential_text(text: &str) -> Result<(CanonicalBytes, CredentialHash), CoreError> {
    let value = CredentialValue::parse(text)?;
    Ok(credential_hash(&value)?)
}
