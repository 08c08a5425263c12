//! # Compute Routes
//!
//! Hashing endpoints that never touch the ledger:
//!
//! - `POST /api/compute`         : canonical form and hash of a credential
//! - `POST /api/pdf-to-json`     : certificate PDF to credential and hash
//! - `POST /api/compute-from-pdf`: alias of `/api/pdf-to-json`
//! - `POST /api/batch`           : CSV rows to credentials and hashes

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use base64::Engine as _;
use credchain_core::{credential_hash, CredentialValue, Timestamp};
use credchain_engine::{credential_from_text, parse_csv_rows, prepare_batch, ExtractError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Assemble the compute router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/compute", post(compute))
        .route("/api/pdf-to-json", post(pdf_to_json))
        .route("/api/compute-from-pdf", post(pdf_to_json))
        .route("/api/batch", post(batch))
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct ComputeRequest {
    /// Credential document.
    #[schema(value_type = Object)]
    pub vc: Option<CredentialValue>,
}

impl Validate for ComputeRequest {
    /// `null`, `false`, `0` and `""` count as missing, like an absent field.
    fn validate(&self) -> Result<(), String> {
        match &self.vc {
            Some(vc) if !is_falsy(vc) => Ok(()),
            _ => Err("vc required".to_string()),
        }
    }
}

fn is_falsy(value: &CredentialValue) -> bool {
    match value {
        CredentialValue::Null => true,
        CredentialValue::Bool(b) => !b,
        CredentialValue::Number(n) => n.as_f64() == Some(0.0),
        CredentialValue::String(s) => s.is_empty(),
        CredentialValue::Sequence(_) | CredentialValue::Mapping(_) => false,
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComputeResponse {
    /// `0x`-prefixed Keccak-256 of the canonical form.
    pub vc_hash: String,
    /// Canonical JSON text that was hashed.
    pub canonical: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PdfRequest {
    /// Base64-encoded PDF document.
    pub pdf_base64: Option<String>,
}

impl Validate for PdfRequest {
    fn validate(&self) -> Result<(), String> {
        match self.pdf_base64.as_deref() {
            Some(b64) if !b64.is_empty() => Ok(()),
            _ => Err("pdfBase64 required".to_string()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PdfResponse {
    #[schema(value_type = Object)]
    pub vc: CredentialValue,
    pub vc_hash: String,
    pub canonical: String,
    /// Text recovered from the document.
    pub raw_text: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchRequest {
    /// CSV text with a header row.
    pub csv: Option<String>,
}

impl Validate for BatchRequest {
    fn validate(&self) -> Result<(), String> {
        match self.csv.as_deref() {
            Some(csv) if !csv.is_empty() => Ok(()),
            _ => Err("csv required".to_string()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    /// Subject address as written in the row.
    pub address: String,
    #[schema(value_type = Object)]
    pub vc: CredentialValue,
    pub vc_hash: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchResponse {
    pub results: Vec<BatchResult>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/compute",
    request_body = ComputeRequest,
    responses(
        (status = 200, description = "Canonical form and hash", body = ComputeResponse),
        (status = 422, description = "Missing or non-canonicalizable credential", body = crate::error::ErrorBody),
    ),
    tag = "compute"
)]
pub(crate) async fn compute(
    body: Result<Json<ComputeRequest>, JsonRejection>,
) -> Result<Json<ComputeResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let vc = req.vc.unwrap_or(CredentialValue::Null);
    let (canonical, hash) = credential_hash(&vc)?;
    Ok(Json(ComputeResponse {
        vc_hash: hash.to_hex(),
        canonical: canonical.into_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/pdf-to-json",
    request_body = PdfRequest,
    responses(
        (status = 200, description = "Credential derived from the document", body = PdfResponse),
        (status = 422, description = "Unreadable document or no subject address", body = crate::error::ErrorBody),
        (status = 503, description = "No PDF extractor configured", body = crate::error::ErrorBody),
    ),
    tag = "compute"
)]
pub(crate) async fn pdf_to_json(
    State(state): State<AppState>,
    body: Result<Json<PdfRequest>, JsonRejection>,
) -> Result<Json<PdfResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let extractor = state
        .extractor
        .clone()
        .ok_or_else(|| AppError::service_unavailable("PDF extraction is not configured"))?;

    let encoded = req.pdf_base64.unwrap_or_default();
    let pdf = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| AppError::Validation(format!("pdfBase64 is not valid base64: {e}")))?;

    // PDF parsing is CPU-bound and may panic on hostile input.
    let raw_text = tokio::task::spawn_blocking(move || extractor.extract_text(&pdf))
        .await
        .map_err(|e| ExtractError::Pdf(format!("extraction aborted: {e}")))??;

    let extracted = credential_from_text(&raw_text, &state.template, Timestamp::now())?;
    tracing::info!(subject = %extracted.subject, hash = %extracted.hash, "credential computed from PDF");
    Ok(Json(PdfResponse {
        vc: extracted.vc,
        vc_hash: extracted.hash.to_hex(),
        canonical: extracted.canonical.into_string(),
        raw_text,
    }))
}

#[utoipa::path(
    post,
    path = "/api/batch",
    request_body = BatchRequest,
    responses(
        (status = 200, description = "Credentials and hashes per row", body = BatchResponse),
        (status = 422, description = "Malformed CSV or invalid row", body = crate::error::ErrorBody),
    ),
    tag = "compute"
)]
pub(crate) async fn batch(
    State(state): State<AppState>,
    body: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let rows = parse_csv_rows(req.csv.as_deref().unwrap_or_default())?;
    let prepared = prepare_batch(&rows, &state.template, Timestamp::now())?;
    let results = prepared
        .into_iter()
        .map(|p| BatchResult {
            address: p.address,
            vc: p.vc,
            vc_hash: p.hash.to_hex(),
        })
        .collect();
    Ok(Json(BatchResponse { results }))
}
