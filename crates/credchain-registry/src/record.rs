//! Ledger-owned record shapes.

use credchain_core::{Address, CredentialHash, Timestamp};
use serde::{Deserialize, Serialize};

/// One entry of a subject's ledger, as returned by `getCred`.
///
/// Owned by the ledger: index positions never change, and only `revoked` may
/// flip (false to true) through a ledger operation outside this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    /// Account that issued the record.
    pub issuer: Address,
    /// Credential content hash.
    pub hash: CredentialHash,
    /// Optional pointer to the full credential content. The ledger stores an
    /// empty string for "none".
    pub locator: Option<String>,
    /// Block timestamp of issuance.
    pub issued_at: Timestamp,
    /// Revocation flag, reported as stored.
    pub revoked: bool,
}

/// Confirmation of a mined `issue` transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueReceipt {
    /// Transaction hash (`0x`-prefixed).
    pub transaction_hash: String,
    /// Block the transaction was mined in.
    pub block_number: u64,
    /// Subject the record was filed under.
    pub subject: Address,
    /// Credential hash that was recorded.
    pub hash: CredentialHash,
    /// Locator that was recorded, if any.
    pub locator: Option<String>,
}

/// Normalize a ledger locator string: empty means absent.
pub(crate) fn locator_from_ledger(raw: String) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw)
    }
}
