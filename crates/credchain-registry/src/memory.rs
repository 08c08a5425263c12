//! In-memory credential ledger.
//!
//! Honors the same [`RegistryClient`] contract as the EVM client: per-subject
//! append-only lists, dense indices, `OutOfRange` past the end. Used by the
//! API's development mode and throughout the test suites.
//!
//! Test hooks: duplicate policy, injected write and read failures, and call
//! counters so that tests can assert how many ledger calls an operation made.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use credchain_core::{keccak256, Address, CredentialHash, Timestamp};
use parking_lot::{Mutex, RwLock};

use crate::client::RegistryClient;
use crate::error::{CallContext, RegistryError};
use crate::record::{CredentialRecord, IssueReceipt};

/// What `issue` does when `(subject, hash)` is already on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Append another record.
    #[default]
    Allow,
    /// Revert the write.
    Reject,
}

#[derive(Debug, Default)]
struct Ledger {
    records: HashMap<Address, Vec<CredentialRecord>>,
    block_number: u64,
}

#[derive(Debug, Default)]
struct Faults {
    reverting_hashes: HashSet<CredentialHash>,
    /// Successful reads left before every read fails.
    reads_remaining: Option<u64>,
}

#[derive(Debug, Default)]
struct CallCounters {
    issue: AtomicU64,
    get_count: AtomicU64,
    get_cred: AtomicU64,
}

/// Append-only ledger held in process memory.
#[derive(Debug)]
pub struct InMemoryRegistry {
    issuer: Address,
    duplicates: DuplicatePolicy,
    ledger: RwLock<Ledger>,
    faults: Mutex<Faults>,
    calls: CallCounters,
}

impl InMemoryRegistry {
    /// Empty ledger; every record is attributed to `issuer`.
    pub fn new(issuer: Address) -> Self {
        Self {
            issuer,
            duplicates: DuplicatePolicy::default(),
            ledger: RwLock::new(Ledger::default()),
            faults: Mutex::new(Faults::default()),
            calls: CallCounters::default(),
        }
    }

    /// Set the duplicate policy.
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    /// The issuing identity recorded on every write.
    pub fn issuer(&self) -> Address {
        self.issuer
    }

    /// Make every future `issue` of `hash` revert.
    pub fn fail_issue_for_hash(&self, hash: CredentialHash) {
        self.faults.lock().reverting_hashes.insert(hash);
    }

    /// Let `n` more reads succeed, then report every read as unavailable.
    pub fn fail_reads_after(&self, n: u64) {
        self.faults.lock().reads_remaining = Some(n);
    }

    /// Remove injected failures.
    pub fn clear_faults(&self) {
        *self.faults.lock() = Faults::default();
    }

    /// Flip the revocation flag of a record. Stands in for the ledger's own
    /// revocation operation, which this client does not expose.
    pub fn revoke(&self, subject: Address, index: u64) -> Result<(), RegistryError> {
        let mut ledger = self.ledger.write();
        let record = ledger
            .records
            .get_mut(&subject)
            .and_then(|list| usize::try_from(index).ok().and_then(|i| list.get_mut(i)))
            .ok_or(RegistryError::OutOfRange { subject, index })?;
        record.revoked = true;
        Ok(())
    }

    /// Snapshot of a subject's ledger, in index order.
    pub fn records(&self, subject: Address) -> Vec<CredentialRecord> {
        self.ledger.read().records.get(&subject).cloned().unwrap_or_default()
    }

    /// Number of `issue` calls received, including failed ones.
    pub fn issue_calls(&self) -> u64 {
        self.calls.issue.load(Ordering::SeqCst)
    }

    /// Number of `get_count` calls received.
    pub fn get_count_calls(&self) -> u64 {
        self.calls.get_count.load(Ordering::SeqCst)
    }

    /// Number of `get_cred` calls received.
    pub fn get_cred_calls(&self) -> u64 {
        self.calls.get_cred.load(Ordering::SeqCst)
    }

    fn admit_read(&self, context: CallContext) -> Result<(), RegistryError> {
        let mut faults = self.faults.lock();
        match faults.reads_remaining.as_mut() {
            Some(0) => Err(RegistryError::Unavailable {
                context,
                reason: "injected read failure".into(),
            }),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RegistryClient for InMemoryRegistry {
    async fn issue(
        &self,
        subject: Address,
        hash: CredentialHash,
        locator: Option<&str>,
    ) -> Result<IssueReceipt, RegistryError> {
        self.calls.issue.fetch_add(1, Ordering::SeqCst);
        let context = CallContext::issue(subject);

        if self.faults.lock().reverting_hashes.contains(&hash) {
            return Err(RegistryError::TransactionReverted {
                context,
                reason: "injected revert".into(),
                transaction_hash: None,
            });
        }

        let mut ledger = self.ledger.write();
        let duplicate = ledger
            .records
            .get(&subject)
            .is_some_and(|list| list.iter().any(|r| r.hash == hash));
        if duplicate && self.duplicates == DuplicatePolicy::Reject {
            return Err(RegistryError::TransactionReverted {
                context,
                reason: "credential already issued".into(),
                transaction_hash: None,
            });
        }

        ledger.block_number += 1;
        let block_number = ledger.block_number;
        let locator = locator.filter(|l| !l.is_empty()).map(str::to_string);
        ledger.records.entry(subject).or_default().push(CredentialRecord {
            issuer: self.issuer,
            hash,
            locator: locator.clone(),
            issued_at: Timestamp::now(),
            revoked: false,
        });

        let mut preimage = Vec::with_capacity(20 + 32 + 8);
        preimage.extend_from_slice(subject.as_bytes());
        preimage.extend_from_slice(hash.as_bytes());
        preimage.extend_from_slice(&block_number.to_be_bytes());
        let transaction_hash = format!("0x{}", hex::encode(keccak256(&preimage)));

        tracing::debug!(%subject, %hash, block_number, "in-memory issue");
        Ok(IssueReceipt {
            transaction_hash,
            block_number,
            subject,
            hash,
            locator,
        })
    }

    async fn get_count(&self, subject: Address) -> Result<u64, RegistryError> {
        self.calls.get_count.fetch_add(1, Ordering::SeqCst);
        self.admit_read(CallContext::get_count(subject))?;
        let ledger = self.ledger.read();
        Ok(ledger.records.get(&subject).map_or(0, |list| list.len() as u64))
    }

    async fn get_cred(&self, subject: Address, index: u64) -> Result<CredentialRecord, RegistryError> {
        self.calls.get_cred.fetch_add(1, Ordering::SeqCst);
        self.admit_read(CallContext::get_cred(subject, index))?;
        let ledger = self.ledger.read();
        ledger
            .records
            .get(&subject)
            .and_then(|list| usize::try_from(index).ok().and_then(|i| list.get(i)))
            .cloned()
            .ok_or(RegistryError::OutOfRange { subject, index })
    }
}
