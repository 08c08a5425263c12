//! # OpenAPI Specification Assembly
//!
//! Collects the utoipa-documented routes into one document served at
//! `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI document for the API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "credchain API",
        version = "0.1.0",
        description = "Credential integrity service: canonical hashing of verifiable credentials, certificate PDF extraction, CSV batch preparation and issuance, and ledger verification against the on-chain credential registry.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:4001", description = "Local development server"),
    ),
    paths(
        crate::routes::compute::compute,
        crate::routes::compute::pdf_to_json,
        crate::routes::compute::batch,
        crate::routes::registry::verify,
        crate::routes::registry::issue,
        crate::routes::registry::batch_issue,
        crate::routes::registry::wallet,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            crate::routes::compute::ComputeRequest,
            crate::routes::compute::ComputeResponse,
            crate::routes::compute::PdfRequest,
            crate::routes::compute::PdfResponse,
            crate::routes::compute::BatchRequest,
            crate::routes::compute::BatchResult,
            crate::routes::compute::BatchResponse,
            crate::routes::registry::VerifyRequest,
            crate::routes::registry::VerifyResponse,
            crate::routes::registry::IssueRequest,
            crate::routes::registry::IssueResponse,
            crate::routes::registry::BatchIssueRequest,
            crate::routes::registry::BatchIssueRow,
            crate::routes::registry::BatchIssueSummary,
            crate::routes::registry::BatchIssueResponse,
            crate::routes::registry::WalletRecord,
            crate::routes::registry::WalletResponse,
        ),
    ),
    tags(
        (name = "compute", description = "Canonical hashing without ledger access"),
        (name = "registry", description = "Ledger verification, issuance and wallet listing"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON document at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
