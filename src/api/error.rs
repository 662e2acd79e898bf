use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

use super::ApiResponse;

/// One violated field in a validation failure.
#[derive(Clone, Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    /// Malformed or out-of-range input, with every violated field listed.
    Validation(Vec<FieldError>),

    /// Progress dated after the current calendar day.
    FutureDate(String),

    /// Register: username or email already taken.
    IdentityTaken,

    /// Login: unknown identifier and wrong password are indistinguishable.
    InvalidCredentials,

    /// Missing/malformed/expired bearer token.
    Unauthorized(String),

    NotFound(String),

    /// Uniqueness violation surfaced to the caller (progress retarget).
    Conflict(String),

    /// Store unreachable; advertises a retry hint.
    ServiceUnavailable(String),

    DatabaseError(String),

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Validation(errors) => write!(f, "Validation failed ({} fields)", errors.len()),
            ApiError::FutureDate(msg) => write!(f, "Future date: {}", msg),
            ApiError::IdentityTaken => write!(f, "Username or email already in use"),
            ApiError::InvalidCredentials => write!(f, "Invalid credentials"),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => {
                let body = ApiResponse::<()>::validation_failure(errors);
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::FutureDate(msg) => {
                let body = ApiResponse::<()>::error(msg);
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::IdentityTaken => {
                let body = ApiResponse::<()>::error("Username or email already in use");
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::InvalidCredentials => {
                let body = ApiResponse::<()>::error("Invalid credentials");
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::Unauthorized(msg) => {
                let body = ApiResponse::<()>::error(msg);
                (StatusCode::UNAUTHORIZED, Json(body)).into_response()
            }
            ApiError::NotFound(msg) => {
                let body = ApiResponse::<()>::error(msg);
                (StatusCode::NOT_FOUND, Json(body)).into_response()
            }
            ApiError::Conflict(msg) => {
                let body = ApiResponse::<()>::error(msg);
                (StatusCode::CONFLICT, Json(body)).into_response()
            }
            ApiError::ServiceUnavailable(msg) => {
                let body = ApiResponse::<()>::error(msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    [(header::RETRY_AFTER, "5")],
                    Json(body),
                )
                    .into_response()
            }
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                let body = ApiResponse::<()>::error("A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                let body = ApiResponse::<()>::error("An internal error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::DatabaseError(format!("{err:#}"))
    }
}

impl ApiError {
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        ApiError::NotFound(format!("{} {} not found", resource, id))
    }

    pub fn habit_not_found(id: i32) -> Self {
        Self::not_found("Habit", id)
    }

    pub fn progress_not_found(id: i32) -> Self {
        Self::not_found("Progress record", id)
    }

    /// Single-field validation failure.
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::InternalError(msg.into())
    }
}
