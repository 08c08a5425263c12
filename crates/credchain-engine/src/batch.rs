//! # Batch Issuance Pipeline
//!
//! Turns CSV rows into degree credentials and issues them one at a time, in
//! row order. Each `issue` call returns only after its write is confirmed,
//! so the ledger sees the batch in the order it was submitted.
//!
//! Failures are collected per row. Under [`FailurePolicy::FailFast`] the
//! first failure stops submission and every later row is reported
//! [`RowStatus::Skipped`].

use std::sync::Arc;

use credchain_core::{credential_hash, Address, CanonicalBytes, CredentialHash, CredentialValue, Timestamp};
use credchain_registry::{IssueReceipt, RegistryClient};
use serde::Serialize;
use uuid::Uuid;

use crate::error::RowError;
use crate::template::{CsvRow, DegreeCredentialTemplate};

/// What to do after a row fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailurePolicy {
    /// Record the failure and carry on with the next row.
    #[default]
    ContinueOnError,
    /// Stop submitting; remaining rows are skipped.
    FailFast,
}

/// A row's credential, canonicalized and hashed but not issued.
#[derive(Debug, Clone)]
pub struct PreparedCredential {
    pub row: usize,
    /// Subject address as written in the row.
    pub address: String,
    pub subject: Address,
    pub vc: CredentialValue,
    pub canonical: CanonicalBytes,
    pub hash: CredentialHash,
}

/// Build and hash every row without touching the ledger.
///
/// # Errors
///
/// The first row that cannot be built or canonicalized.
pub fn prepare_batch(
    rows: &[CsvRow],
    template: &DegreeCredentialTemplate,
    issued_at: Timestamp,
) -> Result<Vec<PreparedCredential>, RowError> {
    rows.iter().map(|row| prepare_row(row, template, issued_at)).collect()
}

fn prepare_row(
    row: &CsvRow,
    template: &DegreeCredentialTemplate,
    issued_at: Timestamp,
) -> Result<PreparedCredential, RowError> {
    let built = template.from_row(row, issued_at)?;
    let (canonical, hash) = credential_hash(&built.vc)?;
    Ok(PreparedCredential {
        row: built.row,
        address: built.address,
        subject: built.subject,
        vc: built.vc,
        canonical,
        hash,
    })
}

/// Outcome of one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RowStatus {
    Issued { receipt: IssueReceipt },
    Failed { code: &'static str, error: String },
    Skipped,
}

/// One row of a batch report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowOutcome {
    pub row: usize,
    /// Subject, when the row got far enough to have one.
    pub subject: Option<Address>,
    pub vc_hash: Option<CredentialHash>,
    #[serde(flatten)]
    pub status: RowStatus,
}

/// Row counts by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub issued: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Everything a batch run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Correlates the run's log lines.
    pub batch_id: Uuid,
    pub policy: FailurePolicy,
    pub rows: Vec<RowOutcome>,
    pub summary: BatchSummary,
}

impl BatchReport {
    /// True when every row was issued.
    pub fn is_success(&self) -> bool {
        self.summary.issued == self.summary.total
    }
}

/// Sequential issuance of templated credentials.
#[derive(Clone)]
pub struct BatchPipeline {
    registry: Arc<dyn RegistryClient>,
    template: DegreeCredentialTemplate,
    policy: FailurePolicy,
}

impl std::fmt::Debug for BatchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchPipeline")
            .field("template", &self.template)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl BatchPipeline {
    pub fn new(registry: Arc<dyn RegistryClient>, template: DegreeCredentialTemplate) -> Self {
        Self {
            registry,
            template,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Issue every row in order. Never fails as a whole; see the per-row
    /// statuses in the report.
    pub async fn run(&self, rows: &[CsvRow], issued_at: Timestamp) -> BatchReport {
        let batch_id = Uuid::new_v4();
        tracing::info!(%batch_id, rows = rows.len(), policy = ?self.policy, "batch issuance started");

        let mut outcomes = Vec::with_capacity(rows.len());
        let mut summary = BatchSummary {
            total: rows.len(),
            ..BatchSummary::default()
        };
        let mut halted = false;

        for row in rows {
            if halted {
                summary.skipped += 1;
                outcomes.push(RowOutcome {
                    row: row.row,
                    subject: None,
                    vc_hash: None,
                    status: RowStatus::Skipped,
                });
                continue;
            }

            let (subject, vc_hash, result) = self.issue_row(row, issued_at).await;
            let status = match result {
                Ok(receipt) => {
                    summary.issued += 1;
                    tracing::info!(%batch_id, row = row.row, tx = %receipt.transaction_hash, "row issued");
                    RowStatus::Issued { receipt }
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(%batch_id, row = row.row, error = %e, "row failed");
                    halted = self.policy == FailurePolicy::FailFast;
                    RowStatus::Failed {
                        code: e.code(),
                        error: e.to_string(),
                    }
                }
            };
            outcomes.push(RowOutcome {
                row: row.row,
                subject,
                vc_hash,
                status,
            });
        }

        tracing::info!(
            %batch_id,
            issued = summary.issued,
            failed = summary.failed,
            skipped = summary.skipped,
            "batch issuance finished"
        );
        BatchReport {
            batch_id,
            policy: self.policy,
            rows: outcomes,
            summary,
        }
    }

    async fn issue_row(
        &self,
        row: &CsvRow,
        issued_at: Timestamp,
    ) -> (Option<Address>, Option<CredentialHash>, Result<IssueReceipt, RowError>) {
        let prepared = match prepare_row(row, &self.template, issued_at) {
            Ok(prepared) => prepared,
            Err(e) => return (None, None, Err(e)),
        };
        let locator = row.get("locator").filter(|l| !l.is_empty());
        let result = self
            .registry
            .issue(prepared.subject, prepared.hash, locator)
            .await
            .map_err(RowError::from);
        (Some(prepared.subject), Some(prepared.hash), result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::parse_csv_rows;
    use credchain_registry::InMemoryRegistry;

    #[test]
    fn prepare_reports_first_bad_row() {
        let rows = parse_csv_rows("address,gpa\n0x70997970c51812dc3a010c7d01b50e0d17dc79c8,9\nnope,8\n").unwrap();
        let err = prepare_batch(&rows, &DegreeCredentialTemplate::default(), Timestamp::now()).unwrap_err();
        assert_eq!(err.code(), "INPUT_ERROR");
        assert!(err.to_string().contains("row 2"));
    }

    #[tokio::test]
    async fn invalid_row_fails_without_issuing() {
        let registry = Arc::new(InMemoryRegistry::new(Address::from_bytes([1; 20])));
        let rows = parse_csv_rows("address,gpa\nnope,8\n").unwrap();
        let report = BatchPipeline::new(registry.clone(), DegreeCredentialTemplate::default())
            .run(&rows, Timestamp::now())
            .await;
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.rows[0].subject, None);
        assert!(matches!(report.rows[0].status, RowStatus::Failed { code: "INPUT_ERROR", .. }));
        assert_eq!(registry.issue_calls(), 0);
        assert!(!report.is_success());
    }

    #[test]
    fn report_serializes_status_tag() {
        let outcome = RowOutcome {
            row: 2,
            subject: None,
            vc_hash: None,
            status: RowStatus::Skipped,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["row"], 2);
    }
}
