//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps domain errors from credchain-core, credchain-registry and
//! credchain-engine to HTTP status codes and JSON error bodies. Internal
//! error details are never returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use credchain_core::{CanonicalizationError, CoreError, HexError};
use credchain_engine::{ExtractError, InputError, RowError, VerifyError};
use credchain_registry::RegistryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request content failed validation, canonicalization or extraction (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (422).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The ledger rejected the write (409).
    #[error("transaction reverted: {0}")]
    Reverted(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),

    /// The registry endpoint failed or answered nonsense (502).
    #[error("registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// A registry call or scan exceeded its deadline (504).
    #[error("timed out: {0}")]
    Timeout(String),

    /// Service dependency not configured (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::Reverted(_) => (StatusCode::CONFLICT, "TRANSACTION_REVERTED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::RegistryUnavailable(_) => (StatusCode::BAD_GATEWAY, "REGISTRY_UNAVAILABLE"),
            Self::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
        }
    }

    /// Construct a service unavailable error (503).
    pub fn service_unavailable(msg: &str) -> Self {
        Self::ServiceUnavailable(msg.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::RegistryUnavailable(_) | Self::Timeout(_) => {
                tracing::error!(error = %self, "registry call failed")
            }
            Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "service unavailable"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<CanonicalizationError> for AppError {
    fn from(err: CanonicalizationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<HexError> for AppError {
    fn from(err: HexError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<InputError> for AppError {
    fn from(err: InputError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match &err {
            RegistryError::TransactionReverted { .. } => Self::Reverted(err.to_string()),
            RegistryError::OutOfRange { .. } => Self::NotFound(err.to_string()),
            RegistryError::Timeout { .. } => Self::Timeout(err.to_string()),
            RegistryError::Unavailable { .. } | RegistryError::MalformedResponse { .. } => {
                Self::RegistryUnavailable(err.to_string())
            }
            RegistryError::Config(_) => Self::ServiceUnavailable(err.to_string()),
        }
    }
}

impl From<VerifyError> for AppError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Canonicalization(e) => e.into(),
            VerifyError::Registry(e) => e.into(),
            VerifyError::NotFound { .. } => Self::NotFound(err.to_string()),
            VerifyError::Timeout { .. } => Self::Timeout(err.to_string()),
            VerifyError::Cancelled { .. } => Self::Internal(err.to_string()),
        }
    }
}

impl From<RowError> for AppError {
    fn from(err: RowError) -> Self {
        match err {
            RowError::Input(e) => e.into(),
            RowError::Canonicalization(e) => e.into(),
            RowError::Registry(e) => e.into(),
        }
    }
}
