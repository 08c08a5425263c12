//! Batch issuance against the in-memory registry.

use std::sync::Arc;

use credchain_core::{Address, Timestamp};
use credchain_engine::{
    parse_csv_rows, prepare_batch, BatchPipeline, DegreeCredentialTemplate, FailurePolicy,
    RowStatus, ScanControl, VerificationEngine, VerifyTarget,
};
use credchain_registry::InMemoryRegistry;

const CSV: &str = "address,givenName,familyName,degree,major,dateAwarded,gpa
0x70997970c51812dc3a010c7d01b50e0d17dc79c8,Asha,Rao,B.Tech,Computer Science,2024-05-01,8.75
0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc,Ravi,Iyer,B.Sc,Physics,2024-05-01,7.9
0x90f79bf6eb2c4f870365e785982e1f101e93b906,Meera,Nair,M.Tech,Robotics,2024-05-01,9.1
";

fn issuer() -> Address {
    "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap()
}

fn issued_at() -> Timestamp {
    Timestamp::parse("2024-05-01T00:00:00Z").unwrap()
}

/// Registry whose `issue` reverts for row 2's credential.
fn registry_reverting_row_two() -> Arc<InMemoryRegistry> {
    let rows = parse_csv_rows(CSV).unwrap();
    let prepared = prepare_batch(&rows, &DegreeCredentialTemplate::default(), issued_at()).unwrap();
    let registry = Arc::new(InMemoryRegistry::new(issuer()));
    registry.fail_issue_for_hash(prepared[1].hash);
    registry
}

#[tokio::test]
async fn continue_on_error_issues_remaining_rows() {
    let registry = registry_reverting_row_two();
    let rows = parse_csv_rows(CSV).unwrap();

    let report = BatchPipeline::new(registry.clone(), DegreeCredentialTemplate::default())
        .run(&rows, issued_at())
        .await;

    assert!(matches!(report.rows[0].status, RowStatus::Issued { .. }));
    assert!(matches!(
        report.rows[1].status,
        RowStatus::Failed { code: "TRANSACTION_REVERTED", .. }
    ));
    assert!(matches!(report.rows[2].status, RowStatus::Issued { .. }));
    assert_eq!(report.summary.total, 3);
    assert_eq!(report.summary.issued, 2);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.skipped, 0);
    assert!(!report.is_success());

    // Row 3 reached the ledger.
    let row3 = report.rows[2].subject.unwrap();
    assert_eq!(registry.records(row3).len(), 1);
    assert_eq!(registry.records(row3)[0].hash, report.rows[2].vc_hash.unwrap());
}

#[tokio::test]
async fn fail_fast_skips_after_first_failure() {
    let registry = registry_reverting_row_two();
    let rows = parse_csv_rows(CSV).unwrap();

    let report = BatchPipeline::new(registry.clone(), DegreeCredentialTemplate::default())
        .with_policy(FailurePolicy::FailFast)
        .run(&rows, issued_at())
        .await;

    assert!(matches!(report.rows[0].status, RowStatus::Issued { .. }));
    assert!(matches!(report.rows[1].status, RowStatus::Failed { .. }));
    assert_eq!(report.rows[2].status, RowStatus::Skipped);
    assert_eq!(report.summary.skipped, 1);
    assert_eq!(registry.issue_calls(), 2);
}

#[tokio::test]
async fn issuance_follows_row_order() {
    let registry = Arc::new(InMemoryRegistry::new(issuer()));
    let rows = parse_csv_rows(CSV).unwrap();

    let report = BatchPipeline::new(registry, DegreeCredentialTemplate::default())
        .run(&rows, issued_at())
        .await;

    assert!(report.is_success());
    let blocks: Vec<u64> = report
        .rows
        .iter()
        .map(|r| match &r.status {
            RowStatus::Issued { receipt } => receipt.block_number,
            other => panic!("unexpected status {other:?}"),
        })
        .collect();
    assert_eq!(blocks, vec![1, 2, 3]);
}

#[tokio::test]
async fn issued_rows_verify() {
    let registry = Arc::new(InMemoryRegistry::new(issuer()));
    let rows = parse_csv_rows(CSV).unwrap();
    let template = DegreeCredentialTemplate::default();

    BatchPipeline::new(registry.clone(), template.clone())
        .run(&rows, issued_at())
        .await;

    let engine = VerificationEngine::new(registry);
    for prepared in prepare_batch(&rows, &template, issued_at()).unwrap() {
        let outcome = engine
            .verify(prepared.subject, VerifyTarget::Credential(prepared.vc), &ScanControl::new())
            .await
            .unwrap();
        assert!(outcome.matched, "row {} did not verify", prepared.row);
        assert_eq!(outcome.record.unwrap().index, 0);
    }
}

#[test]
fn prepare_matches_reference_hash() {
    let rows = parse_csv_rows(CSV).unwrap();
    let prepared = prepare_batch(&rows, &DegreeCredentialTemplate::default(), issued_at()).unwrap();
    assert_eq!(prepared.len(), 3);
    assert_eq!(
        prepared[0].hash.to_string(),
        "0x0992510ca0fa9cc6d5ed4745fa0d2b568198bb284eb45f4fb6b58e6a34c7fb45"
    );
    assert_eq!(prepared[0].address, "0x70997970c51812dc3a010c7d01b50e0d17dc79c8");
}
