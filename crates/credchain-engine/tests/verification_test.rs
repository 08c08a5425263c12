//! Ledger scan behaviour against the in-memory registry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use credchain_core::{credential_hash, Address, CredentialHash, CredentialValue};
use credchain_engine::{ScanControl, VerificationEngine, VerifyError, VerifyTarget};
use credchain_registry::{
    CredentialRecord, InMemoryRegistry, IssueReceipt, RegistryClient, RegistryError,
};

fn subject() -> Address {
    "0x70997970c51812dc3a010c7d01b50e0d17dc79c8".parse().unwrap()
}

fn issuer() -> Address {
    "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap()
}

fn hash(n: u8) -> CredentialHash {
    CredentialHash::from_bytes([n; 32])
}

async fn ledger_with(hashes: &[CredentialHash]) -> Arc<InMemoryRegistry> {
    let registry = Arc::new(InMemoryRegistry::new(issuer()));
    for h in hashes {
        registry.issue(subject(), *h, None).await.unwrap();
    }
    registry
}

#[tokio::test]
async fn match_only_at_k_reports_k() {
    let target = hash(0xee);
    let registry = ledger_with(&[hash(1), hash(2), hash(3), target, hash(4)]).await;
    let engine = VerificationEngine::new(registry.clone());

    let outcome = engine
        .verify(subject(), VerifyTarget::Hash(target), &ScanControl::new())
        .await
        .unwrap();

    assert!(outcome.matched);
    let record = outcome.record.clone().unwrap();
    assert_eq!(record.index, 3);
    assert_eq!(record.issuer, issuer());
    assert!(!record.revoked);
    // Stops at the match.
    assert_eq!(outcome.scanned, 4);
    assert_eq!(registry.get_cred_calls(), 4);
}

#[tokio::test]
async fn empty_ledger_is_no_match_without_fetches() {
    let registry = ledger_with(&[]).await;
    let engine = VerificationEngine::new(registry.clone());

    let outcome = engine
        .verify(subject(), VerifyTarget::Hash(hash(1)), &ScanControl::new())
        .await
        .unwrap();

    assert!(!outcome.matched);
    assert!(outcome.record.is_none());
    assert_eq!(registry.get_count_calls(), 1);
    assert_eq!(registry.get_cred_calls(), 0);
}

#[tokio::test]
async fn exhausted_ledger_is_no_match() {
    let registry = ledger_with(&[hash(1), hash(2)]).await;
    let engine = VerificationEngine::new(registry.clone());
    let outcome = engine
        .verify(subject(), VerifyTarget::Hash(hash(9)), &ScanControl::new())
        .await
        .unwrap();
    assert!(!outcome.matched);
    assert_eq!(outcome.scanned, 2);
}

#[tokio::test]
async fn duplicate_hashes_resolve_to_lowest_index() {
    let target = hash(0xee);
    let registry = ledger_with(&[hash(1), target, hash(2), target]).await;
    let engine = VerificationEngine::new(registry);

    let outcome = engine
        .verify(subject(), VerifyTarget::Hash(target), &ScanControl::new())
        .await
        .unwrap();
    assert_eq!(outcome.record.unwrap().index, 1);
}

#[tokio::test]
async fn credential_target_is_key_order_independent() {
    let issued = CredentialValue::parse(r#"{"name":"Asha","gpa":9.0,"degree":{"major":"CS","name":"B.Tech"}}"#).unwrap();
    let presented = CredentialValue::parse(r#"{"degree":{"name":"B.Tech","major":"CS"},"gpa":9,"name":"Asha"}"#).unwrap();
    let (_, issued_hash) = credential_hash(&issued).unwrap();
    let registry = ledger_with(&[hash(1), issued_hash]).await;
    let engine = VerificationEngine::new(registry);

    let outcome = engine
        .verify(subject(), VerifyTarget::Credential(presented), &ScanControl::new())
        .await
        .unwrap();
    assert!(outcome.matched);
    assert_eq!(outcome.vc_hash, issued_hash);
    assert_eq!(outcome.record.unwrap().index, 1);
}

#[tokio::test]
async fn revoked_match_is_reported_not_rejected() {
    let target = hash(0xee);
    let registry = ledger_with(&[target]).await;
    registry.revoke(subject(), 0).unwrap();
    let engine = VerificationEngine::new(registry);

    let outcome = engine
        .verify(subject(), VerifyTarget::Hash(target), &ScanControl::new())
        .await
        .unwrap();
    assert!(outcome.matched);
    assert!(outcome.record.unwrap().revoked);
}

#[tokio::test]
async fn mid_scan_failure_is_unavailable_not_no_match() {
    let target = hash(0xee);
    let registry = ledger_with(&[hash(1), hash(2), target]).await;
    // getCount and getCred(0) succeed, getCred(1) fails.
    registry.fail_reads_after(2);
    let engine = VerificationEngine::new(registry);

    let err = engine
        .verify(subject(), VerifyTarget::Hash(target), &ScanControl::new())
        .await
        .unwrap_err();
    match err {
        VerifyError::Registry(RegistryError::Unavailable { context, .. }) => {
            assert_eq!(context.index, Some(1));
        }
        other => panic!("expected Unavailable, got {other:?}"),
    }
}

/// Wraps a registry to slow down or interfere with `get_cred`.
struct Instrumented {
    inner: Arc<InMemoryRegistry>,
    delay: Duration,
    cancel_after_first: Option<ScanControl>,
}

#[async_trait]
impl RegistryClient for Instrumented {
    async fn issue(
        &self,
        subject: Address,
        hash: CredentialHash,
        locator: Option<&str>,
    ) -> Result<IssueReceipt, RegistryError> {
        self.inner.issue(subject, hash, locator).await
    }

    async fn get_count(&self, subject: Address) -> Result<u64, RegistryError> {
        self.inner.get_count(subject).await
    }

    async fn get_cred(&self, subject: Address, index: u64) -> Result<CredentialRecord, RegistryError> {
        tokio::time::sleep(self.delay).await;
        if let Some(control) = &self.cancel_after_first {
            control.cancel();
        }
        self.inner.get_cred(subject, index).await
    }
}

#[tokio::test]
async fn deadline_bounds_in_flight_fetch() {
    let inner = ledger_with(&[hash(1), hash(2)]).await;
    let engine = VerificationEngine::new(Arc::new(Instrumented {
        inner,
        delay: Duration::from_secs(10),
        cancel_after_first: None,
    }));

    let control = ScanControl::new().with_timeout(Duration::from_millis(50));
    let err = engine
        .verify(subject(), VerifyTarget::Hash(hash(2)), &control)
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::Timeout { index: Some(0), .. }), "{err}");
}

#[tokio::test]
async fn cancellation_is_observed_at_next_fetch() {
    let inner = ledger_with(&[hash(1), hash(2), hash(3)]).await;
    let control = ScanControl::new();
    let engine = VerificationEngine::new(Arc::new(Instrumented {
        inner: inner.clone(),
        delay: Duration::ZERO,
        cancel_after_first: Some(control.clone()),
    }));

    let err = engine
        .verify(subject(), VerifyTarget::Hash(hash(3)), &control)
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::Cancelled { index: Some(1), .. }), "{err}");
    assert_eq!(inner.get_cred_calls(), 1);
}

#[tokio::test]
async fn list_records_preserves_index_order() {
    let hashes: Vec<CredentialHash> = (0..10).map(hash).collect();
    let inner = ledger_with(&hashes).await;
    let engine = VerificationEngine::new(Arc::new(Instrumented {
        inner,
        delay: Duration::from_millis(5),
        cancel_after_first: None,
    }))
    .with_list_concurrency(4);

    let records = engine.list_records(subject()).await.unwrap();
    assert_eq!(records.len(), 10);
    for (i, entry) in records.iter().enumerate() {
        assert_eq!(entry.index, i as u64);
        assert_eq!(entry.record.hash, hashes[i]);
    }
}

#[tokio::test]
async fn list_records_surfaces_read_failure() {
    let registry = ledger_with(&[hash(1), hash(2)]).await;
    registry.fail_reads_after(1);
    let engine = VerificationEngine::new(registry);
    assert!(engine.list_records(subject()).await.is_err());
}
