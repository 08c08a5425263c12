//! # Verification Engine
//!
//! Relates a credential (or a precomputed hash) to a subject's ledger:
//!
//! 1. Hash the credential unless a hash was supplied.
//! 2. Read `getCount(subject)`.
//! 3. Fetch indices `0..count` in ascending order and stop at the first
//!    record whose hash equals the target.
//!
//! Hashes are compared as decoded bytes, which is hex equality ignoring
//! case. The lowest matching index wins. Revocation is reported, not
//! enforced: a revoked match is still a match.
//!
//! The scan is sequential within one call. A failed read aborts it with
//! [`VerifyError::Registry`]; it is never reported as "no match".
//!
//! ## Cancellation
//!
//! [`ScanControl`] is consulted before the count read and before every
//! per-index fetch. A deadline also bounds the fetch in flight.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use credchain_core::{credential_hash, Address, CredentialHash, CredentialValue, Timestamp};
use credchain_registry::{CredentialRecord, RegistryClient, RegistryError};
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;
use tokio::time::Instant;

use crate::error::VerifyError;

/// Default bound on concurrent fetches when listing a wallet.
pub const DEFAULT_LIST_CONCURRENCY: usize = 8;

/// What to look for.
#[derive(Debug, Clone)]
pub enum VerifyTarget {
    /// A credential document, hashed before the scan.
    Credential(CredentialValue),
    /// A precomputed credential hash.
    Hash(CredentialHash),
}

/// Cancellation flag and optional deadline for one scan.
///
/// Clones share the cancellation flag, so a caller can keep one clone and
/// cancel a scan running on another task.
#[derive(Debug, Clone, Default)]
pub struct ScanControl {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl ScanControl {
    /// No deadline, not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the scan once `deadline` passes.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Fail the scan `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Request cancellation. Takes effect at the next fetch boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn checkpoint(&self, subject: Address, index: Option<u64>) -> Result<(), VerifyError> {
        if self.is_cancelled() {
            return Err(VerifyError::Cancelled { subject, index });
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(VerifyError::Timeout { subject, index });
        }
        Ok(())
    }

    async fn bounded<T, F>(&self, subject: Address, index: Option<u64>, fetch: F) -> Result<T, VerifyError>
    where
        F: Future<Output = Result<T, RegistryError>>,
    {
        self.checkpoint(subject, index)?;
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, fetch)
                .await
                .map_err(|_| VerifyError::Timeout { subject, index })?
                .map_err(VerifyError::from),
            None => fetch.await.map_err(VerifyError::from),
        }
    }
}

/// The matching record and where it sits on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedRecord {
    pub index: u64,
    pub issuer: Address,
    pub locator: Option<String>,
    pub issued_at: Timestamp,
    pub revoked: bool,
}

/// Result of a completed scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub matched: bool,
    pub subject: Address,
    pub vc_hash: CredentialHash,
    /// Records examined, including the match.
    pub scanned: u64,
    #[serde(flatten)]
    pub record: Option<MatchedRecord>,
}

impl VerificationOutcome {
    /// Treat absence as an error.
    pub fn require_match(self) -> Result<MatchedRecord, VerifyError> {
        self.record.ok_or(VerifyError::NotFound {
            subject: self.subject,
            hash: self.vc_hash,
        })
    }
}

/// A ledger record with its index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedRecord {
    pub index: u64,
    #[serde(flatten)]
    pub record: CredentialRecord,
}

/// Scans subject ledgers through a [`RegistryClient`].
#[derive(Clone)]
pub struct VerificationEngine {
    registry: Arc<dyn RegistryClient>,
    list_concurrency: usize,
}

impl std::fmt::Debug for VerificationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationEngine")
            .field("list_concurrency", &self.list_concurrency)
            .finish_non_exhaustive()
    }
}

impl VerificationEngine {
    pub fn new(registry: Arc<dyn RegistryClient>) -> Self {
        Self {
            registry,
            list_concurrency: DEFAULT_LIST_CONCURRENCY,
        }
    }

    /// Bound concurrent fetches in [`list_records`](Self::list_records).
    pub fn with_list_concurrency(mut self, n: usize) -> Self {
        self.list_concurrency = n.max(1);
        self
    }

    /// Scan `subject`'s ledger for `target`.
    ///
    /// # Errors
    ///
    /// - [`VerifyError::Canonicalization`] if the credential cannot be hashed.
    /// - [`VerifyError::Registry`] if any ledger read fails.
    /// - [`VerifyError::Timeout`] / [`VerifyError::Cancelled`] per `control`.
    ///
    /// No match is `Ok` with `matched: false`.
    pub async fn verify(
        &self,
        subject: Address,
        target: VerifyTarget,
        control: &ScanControl,
    ) -> Result<VerificationOutcome, VerifyError> {
        let hash = match target {
            VerifyTarget::Credential(vc) => credential_hash(&vc)?.1,
            VerifyTarget::Hash(hash) => hash,
        };

        let count = control
            .bounded(subject, None, self.registry.get_count(subject))
            .await?;
        tracing::debug!(%subject, %hash, count, "scanning ledger");

        for index in 0..count {
            let record = control
                .bounded(subject, Some(index), self.registry.get_cred(subject, index))
                .await?;
            if record.hash == hash {
                tracing::info!(%subject, %hash, index, revoked = record.revoked, "credential matched");
                return Ok(VerificationOutcome {
                    matched: true,
                    subject,
                    vc_hash: hash,
                    scanned: index + 1,
                    record: Some(MatchedRecord {
                        index,
                        issuer: record.issuer,
                        locator: record.locator,
                        issued_at: record.issued_at,
                        revoked: record.revoked,
                    }),
                });
            }
        }

        tracing::info!(%subject, %hash, count, "no matching credential");
        Ok(VerificationOutcome {
            matched: false,
            subject,
            vc_hash: hash,
            scanned: count,
            record: None,
        })
    }

    /// Every record on `subject`'s ledger, in index order. Fetches run
    /// concurrently up to the configured bound.
    pub async fn list_records(&self, subject: Address) -> Result<Vec<IndexedRecord>, RegistryError> {
        let count = self.registry.get_count(subject).await?;
        let registry = &self.registry;
        futures::stream::iter(0..count)
            .map(|index| async move {
                let record = registry.get_cred(subject, index).await?;
                Ok::<_, RegistryError>(IndexedRecord { index, record })
            })
            .buffered(self.list_concurrency)
            .try_collect()
            .await
    }
}
