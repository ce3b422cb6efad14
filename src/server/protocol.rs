//! Protocol types for the HTTP API
//!
//! Successful lookups return [`LookupResponse`](crate::lens::lookup::LookupResponse);
//! everything else that goes wrong is reported as an [`ErrorBody`].

use crate::lens::lookup::LookupError;
use crate::snapshot::SnapshotInfo;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::any::Any;

// =============================================================================
// Error Types
// =============================================================================

/// Error codes returned in [`ErrorBody`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Path parameter is not a single IP address
    InvalidAddress,
    /// Unexpected server error
    InternalError,
}

/// Error payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// HTTP status code as a string, mirroring `LookupResponse.status`
    pub status: String,
    pub code: ErrorCode,
    /// Human-readable error message
    pub error: String,
}

/// Error returned by HTTP handlers
#[derive(Debug, Clone)]
pub enum ApiError {
    InvalidAddress(String),
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let (code, error) = match self {
            ApiError::InvalidAddress(msg) => (ErrorCode::InvalidAddress, msg.clone()),
            ApiError::Internal(msg) => (ErrorCode::InternalError, msg.clone()),
        };
        ErrorBody {
            status: self.status_code().as_u16().to_string(),
            code,
            error,
        }
    }
}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::InvalidAddress(_) => ApiError::InvalidAddress(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(msg) = &self {
            tracing::error!("internal error: {}", msg);
        }
        (self.status_code(), Json(self.to_body())).into_response()
    }
}

/// Turn a handler panic into a 500 [`ErrorBody`] instead of a dropped connection
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let msg = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    ApiError::Internal(msg).into_response()
}

// =============================================================================
// System Info Types
// =============================================================================

/// Health/system information response
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    /// Server version
    pub server_version: String,

    /// Currently published index
    pub index: SnapshotInfo,
}

impl SystemInfo {
    pub fn new(index: SnapshotInfo) -> Self {
        Self {
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            index,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
