//! Registry client error types.
//!
//! Every error carries the [`CallContext`] it arose in (operation, subject,
//! index) so that callers can decide whether to retry a read or surface a
//! write failure to an operator.

use std::fmt;

use credchain_core::Address;

use crate::config::ConfigError;

/// The registry operation a call belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `issue(address,bytes32,string)`.
    Issue,
    /// `getCount(address)`.
    GetCount,
    /// `getCred(address,uint256)`.
    GetCred,
}

impl Operation {
    /// Contract-level name of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::GetCount => "getCount",
            Self::GetCred => "getCred",
        }
    }

    /// True for operations that mutate the ledger.
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Issue)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a registry call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// Operation in flight.
    pub operation: Operation,
    /// Subject whose ledger was addressed.
    pub subject: Address,
    /// Record index, for `getCred`.
    pub index: Option<u64>,
}

impl CallContext {
    /// Context for an `issue` call.
    pub fn issue(subject: Address) -> Self {
        Self { operation: Operation::Issue, subject, index: None }
    }

    /// Context for a `getCount` call.
    pub fn get_count(subject: Address) -> Self {
        Self { operation: Operation::GetCount, subject, index: None }
    }

    /// Context for a `getCred` call.
    pub fn get_cred(subject: Address, index: u64) -> Self {
        Self { operation: Operation::GetCred, subject, index: Some(index) }
    }
}

impl fmt::Display for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}(subject={}, index={i})", self.operation, self.subject),
            None => write!(f, "{}(subject={})", self.operation, self.subject),
        }
    }
}

/// Errors from registry calls.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Network or RPC transport failure. For writes the transaction may or
    /// may not have been broadcast.
    #[error("registry unavailable during {context}: {reason}")]
    Unavailable { context: CallContext, reason: String },

    /// The ledger rejected the transaction (unauthorized signer, insufficient
    /// funds, duplicate policy) or it was mined with a failed status.
    #[error("transaction reverted during {context}: {reason}")]
    TransactionReverted {
        context: CallContext,
        reason: String,
        transaction_hash: Option<String>,
    },

    /// `getCred` was called with `index >= getCount(subject)`.
    #[error("index {index} out of range for subject {subject}")]
    OutOfRange { subject: Address, index: u64 },

    /// A request or confirmation wait exceeded its deadline.
    #[error("timed out after {waited_ms}ms during {context}")]
    Timeout { context: CallContext, waited_ms: u64 },

    /// The endpoint answered with something that is not a valid result for
    /// the call.
    #[error("malformed registry response during {context}: {reason}")]
    MalformedResponse { context: CallContext, reason: String },

    /// The client is not configured for the requested operation.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl RegistryError {
    /// The call context, when the error arose from a specific call.
    pub fn context(&self) -> Option<&CallContext> {
        match self {
            Self::Unavailable { context, .. }
            | Self::TransactionReverted { context, .. }
            | Self::Timeout { context, .. }
            | Self::MalformedResponse { context, .. } => Some(context),
            Self::OutOfRange { .. } | Self::Config(_) => None,
        }
    }

    /// True when repeating the same read could succeed. Writes are never
    /// reported as retryable.
    pub fn is_retryable_read(&self) -> bool {
        match self {
            Self::Unavailable { context, .. } | Self::Timeout { context, .. } => {
                !context.operation.is_write()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> Address {
        Address::from_bytes([0x22; 20])
    }

    #[test]
    fn context_display_includes_index() {
        let ctx = CallContext::get_cred(subject(), 4);
        assert_eq!(
            ctx.to_string(),
            format!("getCred(subject=0x{}, index=4)", "22".repeat(20))
        );
        assert_eq!(
            CallContext::get_count(subject()).to_string(),
            format!("getCount(subject=0x{})", "22".repeat(20))
        );
    }

    #[test]
    fn only_read_failures_are_retryable() {
        let read = RegistryError::Unavailable {
            context: CallContext::get_count(subject()),
            reason: "connection refused".into(),
        };
        let write = RegistryError::Unavailable {
            context: CallContext::issue(subject()),
            reason: "connection refused".into(),
        };
        assert!(read.is_retryable_read());
        assert!(!write.is_retryable_read());
        assert!(!RegistryError::OutOfRange { subject: subject(), index: 0 }.is_retryable_read());
    }

    #[test]
    fn out_of_range_has_no_call_context() {
        let err = RegistryError::OutOfRange { subject: subject(), index: 9 };
        assert!(err.context().is_none());
        assert!(err.to_string().contains("index 9"));
    }
}
