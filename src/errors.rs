//! API error types.
//!
//! Every failure surfaced to a caller carries a stable `code` for
//! programmatic handling plus a human-readable message. Orchestration
//! failures keep track of *which* asset was involved so a partial dual
//! upload is never reported as an anonymous 500.

use crate::assets::{AssetKind, AssetStoreError};
use crate::staging::StagingError;
use crate::store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use uuid::Uuid;

/// JSON body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Stable error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("book {0} not found")]
    NotFound(Uuid),

    #[error("{asset} upload failed: {source}")]
    AssetUpload {
        asset: AssetKind,
        #[source]
        source: AssetStoreError,
    },

    #[error(
        "catalog entry was not persisted after both assets were stored; \
         orphaned remote objects: {orphans:?}: {source}"
    )]
    Persist {
        orphans: Vec<String>,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Get the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::AssetUpload { .. } => "asset_upload_failed",
            Self::Persist { .. } => "persist_failed",
            Self::Staging(StagingError::TooLarge { .. }) => "payload_too_large",
            Self::Staging(_) => "staging_error",
            Self::Store(_) => "database_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AssetUpload { .. } => StatusCode::BAD_GATEWAY,
            Self::Persist { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Staging(e) => match e {
                StagingError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                StagingError::InvalidName(_) => StatusCode::BAD_REQUEST,
                StagingError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers and the catalog service.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
