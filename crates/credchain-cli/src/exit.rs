//! # Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | success |
//! | 1 | usage error (bad arguments, unparsable address or hash) |
//! | 2 | credential not found on the ledger |
//! | 3 | registry unavailable or timed out |
//! | 4 | transaction reverted |
//! | 5 | any other failure, including a batch with failed rows |

use credchain_engine::{RowError, VerifyError};
use credchain_registry::{ConfigError, RegistryError};

pub const SUCCESS: u8 = 0;
pub const USAGE: u8 = 1;
pub const NOT_FOUND: u8 = 2;
pub const UNAVAILABLE: u8 = 3;
pub const REVERTED: u8 = 4;
pub const FAILURE: u8 = 5;

/// An argument that clap accepted but the command could not use.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct UsageError(pub String);

/// Map a command failure to its exit code.
///
/// Walks the error chain and classifies the first registry, verification
/// or usage error it finds.
pub fn classify(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if cause.is::<UsageError>() || cause.is::<ConfigError>() {
            return USAGE;
        }
        if let Some(e) = cause.downcast_ref::<RegistryError>() {
            return registry_code(e);
        }
        if let Some(e) = cause.downcast_ref::<VerifyError>() {
            return match e {
                VerifyError::Registry(inner) => registry_code(inner),
                VerifyError::NotFound { .. } => NOT_FOUND,
                VerifyError::Timeout { .. } => UNAVAILABLE,
                VerifyError::Canonicalization(_) | VerifyError::Cancelled { .. } => FAILURE,
            };
        }
        if let Some(RowError::Registry(inner)) = cause.downcast_ref::<RowError>() {
            return registry_code(inner);
        }
    }
    FAILURE
}

fn registry_code(err: &RegistryError) -> u8 {
    match err {
        RegistryError::Unavailable { .. }
        | RegistryError::Timeout { .. }
        | RegistryError::MalformedResponse { .. } => UNAVAILABLE,
        RegistryError::TransactionReverted { .. } => REVERTED,
        RegistryError::OutOfRange { .. } => NOT_FOUND,
        RegistryError::Config(_) => USAGE,
    }
}
