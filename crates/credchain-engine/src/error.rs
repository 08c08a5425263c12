//! Engine error types.

use credchain_core::{Address, CanonicalizationError, CredentialHash, HexError};
use credchain_registry::RegistryError;

/// Errors from a verification scan.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// The supplied credential could not be canonicalized.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A ledger read failed. Never reported as "not found".
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The scan finished without a match and the caller asked for one.
    #[error("no record of {hash} for subject {subject}")]
    NotFound {
        subject: Address,
        hash: CredentialHash,
    },

    /// The scan deadline passed. `index` is the fetch that was pending,
    /// `None` for the count read.
    #[error("verification of subject {subject} timed out at index {index:?}")]
    Timeout { subject: Address, index: Option<u64> },

    /// The scan was cancelled by its caller.
    #[error("verification of subject {subject} cancelled at index {index:?}")]
    Cancelled { subject: Address, index: Option<u64> },
}

/// Invalid tabular or document input.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: missing required field '{field}'")]
    MissingField { row: usize, field: &'static str },

    #[error("row {row}: invalid subject address {value:?}: {source}")]
    InvalidAddress {
        row: usize,
        value: String,
        #[source]
        source: HexError,
    },

    #[error("row {row}: field '{field}' is not a finite number: {value:?}")]
    InvalidNumber {
        row: usize,
        field: &'static str,
        value: String,
    },
}

/// Failures turning document text into a credential.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// No line carried a usable subject identity. Extraction never falls
    /// back to a default account.
    #[error("subject identity not found in document text (candidate: {candidate:?})")]
    SubjectNotFound { candidate: Option<String> },

    /// The document could not be read as PDF.
    #[error("PDF text extraction failed: {0}")]
    Pdf(String),

    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// Why one batch row failed.
#[derive(Debug, thiserror::Error)]
pub enum RowError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl RowError {
    /// Stable machine-readable code for reports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Input(_) => "INPUT_ERROR",
            Self::Canonicalization(_) => "CANONICALIZATION_ERROR",
            Self::Registry(RegistryError::TransactionReverted { .. }) => "TRANSACTION_REVERTED",
            Self::Registry(RegistryError::Timeout { .. }) => "TIMEOUT",
            Self::Registry(RegistryError::OutOfRange { .. }) => "OUT_OF_RANGE",
            Self::Registry(RegistryError::Config(_)) => "CONFIGURATION_ERROR",
            Self::Registry(_) => "REGISTRY_UNAVAILABLE",
        }
    }
}
