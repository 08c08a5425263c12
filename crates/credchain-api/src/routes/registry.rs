//! # Registry Routes
//!
//! Ledger-backed endpoints. Every route here answers 503 when the server
//! runs without a registry client.
//!
//! - `POST /api/verify`         : scan a subject's ledger for a credential
//! - `POST /api/issue`          : record one credential hash
//! - `POST /api/batch/issue`    : issue CSV rows in order, report per row
//! - `GET  /api/wallet/:subject`: every record filed under a subject

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use credchain_core::{Address, CredentialHash, CredentialValue, Timestamp};
use credchain_engine::{
    parse_csv_rows, BatchPipeline, BatchReport, FailurePolicy, IndexedRecord, RowStatus,
    VerificationEngine, VerificationOutcome, VerifyTarget,
};
use credchain_registry::{IssueReceipt, RegistryClient};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Assemble the registry router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/verify", post(verify))
        .route("/api/issue", post(issue))
        .route("/api/batch/issue", post(batch_issue))
        .route("/api/wallet/:subject", get(wallet))
}

fn require_registry(state: &AppState) -> Result<Arc<dyn RegistryClient>, AppError> {
    state
        .registry
        .clone()
        .ok_or_else(|| AppError::service_unavailable("registry is not configured"))
}

fn parse_subject(raw: &str) -> Result<Address, AppError> {
    raw.trim()
        .parse()
        .map_err(|e| AppError::Validation(format!("invalid subject address: {e}")))
}

fn parse_hash(raw: &str) -> Result<CredentialHash, AppError> {
    raw.trim()
        .parse()
        .map_err(|e| AppError::Validation(format!("invalid vcHash: {e}")))
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// Subject account address.
    pub subject: String,
    /// Credential document to hash and look up.
    #[schema(value_type = Option<Object>)]
    pub vc: Option<CredentialValue>,
    /// Precomputed `0x`-prefixed credential hash.
    pub vc_hash: Option<String>,
}

impl Validate for VerifyRequest {
    fn validate(&self) -> Result<(), String> {
        match (&self.vc, &self.vc_hash) {
            (Some(_), None) | (None, Some(_)) => Ok(()),
            (Some(_), Some(_)) => Err("provide either vc or vcHash, not both".to_string()),
            (None, None) => Err("vc or vcHash required".to_string()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub matched: bool,
    pub subject: String,
    pub vc_hash: String,
    /// Records examined, including the match.
    pub scanned: u64,
    /// Ledger index of the first matching record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
    /// RFC 3339 issuance time of the matching record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked: Option<bool>,
}

impl From<VerificationOutcome> for VerifyResponse {
    fn from(outcome: VerificationOutcome) -> Self {
        let record = outcome.record;
        Self {
            matched: outcome.matched,
            subject: outcome.subject.to_hex(),
            vc_hash: outcome.vc_hash.to_hex(),
            scanned: outcome.scanned,
            index: record.as_ref().map(|r| r.index),
            issuer: record.as_ref().map(|r| r.issuer.to_hex()),
            locator: record.as_ref().and_then(|r| r.locator.clone()),
            issued_at: record.as_ref().map(|r| r.issued_at.to_iso8601()),
            revoked: record.as_ref().map(|r| r.revoked),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    pub subject: String,
    pub vc_hash: String,
    /// Pointer to the full credential content.
    #[serde(default)]
    pub locator: Option<String>,
}

impl Validate for IssueRequest {
    fn validate(&self) -> Result<(), String> {
        if self.subject.trim().is_empty() {
            return Err("subject required".to_string());
        }
        if self.vc_hash.trim().is_empty() {
            return Err("vcHash required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    pub transaction_hash: String,
    pub block_number: u64,
    pub subject: String,
    pub vc_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
}

impl From<IssueReceipt> for IssueResponse {
    fn from(receipt: IssueReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            subject: receipt.subject.to_hex(),
            vc_hash: receipt.hash.to_hex(),
            locator: receipt.locator,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchIssueRequest {
    /// CSV text with a header row.
    pub csv: String,
    /// Stop at the first failed row and skip the rest.
    #[serde(default)]
    pub fail_fast: bool,
}

impl Validate for BatchIssueRequest {
    fn validate(&self) -> Result<(), String> {
        if self.csv.is_empty() {
            return Err("csv required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchIssueRow {
    /// 1-based data row number.
    pub row: usize,
    /// `issued`, `failed` or `skipped`.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vc_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Machine-readable failure code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchIssueSummary {
    pub total: usize,
    pub issued: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchIssueResponse {
    pub batch_id: Uuid,
    pub fail_fast: bool,
    pub rows: Vec<BatchIssueRow>,
    pub summary: BatchIssueSummary,
}

impl From<BatchReport> for BatchIssueResponse {
    fn from(report: BatchReport) -> Self {
        let rows = report
            .rows
            .into_iter()
            .map(|outcome| {
                let mut row = BatchIssueRow {
                    row: outcome.row,
                    status: String::new(),
                    subject: outcome.subject.map(|s| s.to_hex()),
                    vc_hash: outcome.vc_hash.map(|h| h.to_hex()),
                    transaction_hash: None,
                    block_number: None,
                    code: None,
                    error: None,
                };
                match outcome.status {
                    RowStatus::Issued { receipt } => {
                        row.status = "issued".to_string();
                        row.transaction_hash = Some(receipt.transaction_hash);
                        row.block_number = Some(receipt.block_number);
                    }
                    RowStatus::Failed { code, error } => {
                        row.status = "failed".to_string();
                        row.code = Some(code.to_string());
                        row.error = Some(error);
                    }
                    RowStatus::Skipped => row.status = "skipped".to_string(),
                }
                row
            })
            .collect();
        Self {
            batch_id: report.batch_id,
            fail_fast: report.policy == FailurePolicy::FailFast,
            rows,
            summary: BatchIssueSummary {
                total: report.summary.total,
                issued: report.summary.issued,
                failed: report.summary.failed,
                skipped: report.summary.skipped,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecord {
    pub index: u64,
    pub issuer: String,
    pub vc_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
    pub issued_at: String,
    pub revoked: bool,
}

impl From<IndexedRecord> for WalletRecord {
    fn from(entry: IndexedRecord) -> Self {
        Self {
            index: entry.index,
            issuer: entry.record.issuer.to_hex(),
            vc_hash: entry.record.hash.to_hex(),
            locator: entry.record.locator,
            issued_at: entry.record.issued_at.to_iso8601(),
            revoked: entry.record.revoked,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WalletResponse {
    pub subject: String,
    pub count: usize,
    pub records: Vec<WalletRecord>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Scan completed; see `matched`", body = VerifyResponse),
        (status = 422, description = "Invalid subject, hash or credential", body = crate::error::ErrorBody),
        (status = 502, description = "Registry read failed", body = crate::error::ErrorBody),
        (status = 503, description = "No registry configured", body = crate::error::ErrorBody),
        (status = 504, description = "Scan deadline exceeded", body = crate::error::ErrorBody),
    ),
    tag = "registry"
)]
pub(crate) async fn verify(
    State(state): State<AppState>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let registry = require_registry(&state)?;
    let subject = parse_subject(&req.subject)?;
    let target = match (req.vc, req.vc_hash) {
        (Some(vc), _) => VerifyTarget::Credential(vc),
        (None, Some(raw)) => VerifyTarget::Hash(parse_hash(&raw)?),
        (None, None) => return Err(AppError::Validation("vc or vcHash required".to_string())),
    };

    let result = VerificationEngine::new(registry)
        .verify(subject, target, &state.scan_control())
        .await;
    match &result {
        Ok(outcome) if outcome.matched => state.metrics.record_verification("matched"),
        Ok(_) => state.metrics.record_verification("unmatched"),
        Err(_) => state.metrics.record_verification("error"),
    }
    Ok(Json(result?.into()))
}

#[utoipa::path(
    post,
    path = "/api/issue",
    request_body = IssueRequest,
    responses(
        (status = 200, description = "Record confirmed on the ledger", body = IssueResponse),
        (status = 409, description = "Transaction reverted", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid subject or hash", body = crate::error::ErrorBody),
        (status = 502, description = "Registry unavailable; the write may have been broadcast", body = crate::error::ErrorBody),
        (status = 503, description = "No registry or signer configured", body = crate::error::ErrorBody),
    ),
    tag = "registry"
)]
pub(crate) async fn issue(
    State(state): State<AppState>,
    body: Result<Json<IssueRequest>, JsonRejection>,
) -> Result<Json<IssueResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let registry = require_registry(&state)?;
    let subject = parse_subject(&req.subject)?;
    let hash = parse_hash(&req.vc_hash)?;
    let locator = req.locator.as_deref().filter(|l| !l.is_empty());

    match registry.issue(subject, hash, locator).await {
        Ok(receipt) => {
            state.metrics.record_issue("issued");
            Ok(Json(receipt.into()))
        }
        Err(e) => {
            state.metrics.record_issue("failed");
            Err(e.into())
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/batch/issue",
    request_body = BatchIssueRequest,
    responses(
        (status = 200, description = "Per-row batch report", body = BatchIssueResponse),
        (status = 422, description = "Malformed CSV", body = crate::error::ErrorBody),
        (status = 503, description = "No registry configured", body = crate::error::ErrorBody),
    ),
    tag = "registry"
)]
pub(crate) async fn batch_issue(
    State(state): State<AppState>,
    body: Result<Json<BatchIssueRequest>, JsonRejection>,
) -> Result<Json<BatchIssueResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let registry = require_registry(&state)?;
    let rows = parse_csv_rows(&req.csv)?;
    let policy = if req.fail_fast {
        FailurePolicy::FailFast
    } else {
        FailurePolicy::ContinueOnError
    };

    let report = BatchPipeline::new(registry, state.template.clone())
        .with_policy(policy)
        .run(&rows, Timestamp::now())
        .await;
    for row in &report.rows {
        match &row.status {
            RowStatus::Issued { .. } => state.metrics.record_issue("issued"),
            RowStatus::Failed { .. } => state.metrics.record_issue("failed"),
            RowStatus::Skipped => {}
        }
    }
    Ok(Json(report.into()))
}

#[utoipa::path(
    get,
    path = "/api/wallet/{subject}",
    params(
        ("subject" = String, Path, description = "Subject account address")
    ),
    responses(
        (status = 200, description = "All records in index order", body = WalletResponse),
        (status = 422, description = "Invalid subject address", body = crate::error::ErrorBody),
        (status = 502, description = "Registry read failed", body = crate::error::ErrorBody),
        (status = 503, description = "No registry configured", body = crate::error::ErrorBody),
    ),
    tag = "registry"
)]
pub(crate) async fn wallet(
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> Result<Json<WalletResponse>, AppError> {
    let registry = require_registry(&state)?;
    let subject = parse_subject(&subject)?;
    let records = VerificationEngine::new(registry).list_records(subject).await?;
    let records: Vec<WalletRecord> = records.into_iter().map(WalletRecord::from).collect();
    Ok(Json(WalletResponse {
        subject: subject.to_hex(),
        count: records.len(),
        records,
    }))
}
