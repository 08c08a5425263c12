//! The registry call contract.

use async_trait::async_trait;
use credchain_core::{Address, CredentialHash};

use crate::error::RegistryError;
use crate::record::{CredentialRecord, IssueReceipt};

/// Typed access to the append-only credential ledger.
///
/// Implementations must never retry `issue` on their own: a blind retry of a
/// state-mutating call can file the same credential twice. Reads may be
/// retried on transport failure.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Append a record for `subject`. Returns once the write is confirmed.
    ///
    /// # Errors
    ///
    /// [`RegistryError::TransactionReverted`] when the ledger rejects the
    /// write, [`RegistryError::Unavailable`] on transport failure.
    async fn issue(
        &self,
        subject: Address,
        hash: CredentialHash,
        locator: Option<&str>,
    ) -> Result<IssueReceipt, RegistryError>;

    /// Number of records filed under `subject`.
    async fn get_count(&self, subject: Address) -> Result<u64, RegistryError>;

    /// Record `index` of `subject`'s ledger.
    ///
    /// # Errors
    ///
    /// [`RegistryError::OutOfRange`] if `index >= get_count(subject)`.
    async fn get_cred(&self, subject: Address, index: u64) -> Result<CredentialRecord, RegistryError>;
}
