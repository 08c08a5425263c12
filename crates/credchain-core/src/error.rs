//! # Error Types
//!
//! Errors raised by the credential integrity core. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! Parsing and canonicalization are deliberately separate: a `ParseError`
//! means the input never became a [`CredentialValue`](crate::CredentialValue),
//! a `CanonicalizationError` means a well-formed value could not be given a
//! canonical form under the pinned numeric and depth policy.

use thiserror::Error;

/// Top-level error type for the credchain core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The input text was not a well-formed credential value.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A well-formed value could not be canonicalized.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A hash or address failed to parse.
    #[error("invalid identifier: {0}")]
    Hex(#[from] HexError),
}

/// Input text could not be decoded into a credential value.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The text is not valid JSON, or a mapping repeats a key.
    #[error("malformed credential JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// The value nests deeper than the canonicalizer will recurse.
    #[error("value nesting exceeds maximum depth of {max}")]
    DepthExceeded {
        /// Maximum permitted depth.
        max: usize,
    },

    /// An integer cannot be represented exactly as a binary64 number.
    #[error("integer {0} exceeds the exact binary64 range (|n| <= 2^53)")]
    UnsafeInteger(String),

    /// A number is NaN or infinite.
    #[error("non-finite number cannot be canonicalized")]
    NonFiniteNumber,

    /// Scalar serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// A hex identifier (hash or address) failed to parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HexError {
    /// The `0x` prefix is missing.
    #[error("expected 0x prefix in {0:?}")]
    MissingPrefix(String),

    /// The hex body has the wrong length.
    #[error("expected {expected} hex characters, got {actual}")]
    WrongLength {
        /// Required number of hex characters.
        expected: usize,
        /// Observed number of hex characters.
        actual: usize,
    },

    /// The body contains a non-hex character.
    #[error("invalid hex in {0:?}")]
    InvalidHex(String),
}
