use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::kv::KvError;
use common::storage::StorageError;
use sea_orm::DbErr;
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`,
    /// `TOKEN_MISSING`, `TOKEN_INVALID`, `INVALID_CREDENTIALS`,
    /// `PERMISSION_DENIED`, `NOT_FOUND`, `CONFLICT`, `USERNAME_TAKEN`,
    /// `QUOTA_EXCEEDED`, `SESSION_EXPIRED`, `STORAGE_BACKEND`,
    /// `INTERNAL_ERROR`.
    #[schema(example = "QUOTA_EXCEEDED")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Storage quota exceeded: 1048576 bytes needed, 512 available")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    TokenMissing,
    TokenInvalid,
    InvalidCredentials,
    PermissionDenied,
    NotFound(String),
    Conflict(String),
    UsernameTaken,
    /// Capacity check failed. Carries the requested delta and the
    /// remaining headroom at check time.
    QuotaExceeded {
        needed: i64,
        available: i64,
    },
    /// The KV upload session lapsed before completion; the client must
    /// restart the upload protocol.
    SessionExpired,
    /// Signing or network failure against the object-storage backend.
    StorageBackend(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_MISSING",
                    message: "Authentication required".into(),
                },
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_INVALID",
                    message: "Invalid or expired token".into(),
                },
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "INVALID_CREDENTIALS",
                    message: "Invalid username or password".into(),
                },
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "PERMISSION_DENIED",
                    message: "Insufficient permissions".into(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CONFLICT",
                    message: msg,
                },
            ),
            AppError::UsernameTaken => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "USERNAME_TAKEN",
                    message: "Username is already taken".into(),
                },
            ),
            AppError::QuotaExceeded { needed, available } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorBody {
                    code: "QUOTA_EXCEEDED",
                    message: format!(
                        "Storage quota exceeded: {needed} bytes needed, {available} available"
                    ),
                },
            ),
            AppError::SessionExpired => (
                StatusCode::GONE,
                ErrorBody {
                    code: "SESSION_EXPIRED",
                    message: "Upload session not found or expired; restart the upload".into(),
                },
            ),
            AppError::StorageBackend(detail) => {
                tracing::error!("Storage backend error: {}", detail);
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorBody {
                        code: "STORAGE_BACKEND",
                        message: "Object storage backend request failed".into(),
                    },
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidHash(msg) => AppError::Validation(msg),
            StorageError::SizeLimitExceeded { actual, limit } => AppError::Validation(format!(
                "File exceeds maximum size ({actual} > {limit} bytes)"
            )),
            StorageError::NotFound(key) => AppError::NotFound(format!("Object not found: {key}")),
            StorageError::Backend(detail) => AppError::StorageBackend(detail),
        }
    }
}

impl From<KvError> for AppError {
    fn from(err: KvError) -> Self {
        AppError::Internal(format!("Session store: {err}"))
    }
}
