/**
 * Backend Error Types
 *
 * This module defines the error taxonomy used by every handler and
 * database operation in the backend.
 *
 * # Error Kinds
 *
 * - `Validation` - Malformed or missing input; always recoverable by the
 *   caller and never partially applied
 * - `NotFound` - Room, membership, session, document, or share does not
 *   exist
 * - `Forbidden` - Authenticated but not authorized for the action
 * - `Conflict` - Conflicting state: room full, already a member, already
 *   shared, or a whiteboard version mismatch under concurrency
 * - `Unauthenticated` / `AccountLocked` - Identity collaborator
 *   rejections, surfaced unchanged
 * - `Storage` - Underlying persistence failure; the wrapped driver error
 *   is logged but never exposed to the caller
 *
 * Multi-step mutations run inside one transaction, so any of these
 * surfacing mid-sequence leaves state untouched.
 */
use axum::http::StatusCode;
use thiserror::Error;

/// Backend error taxonomy
///
/// Each variant maps to one HTTP status class via `status_code()`. The
/// human-readable message is safe to return to clients; internal detail
/// (driver errors) stays in the `Storage` source and is only logged.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing input
    #[error("{0}")]
    Validation(String),

    /// Requested entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// Authenticated but not authorized
    #[error("{0}")]
    Forbidden(String),

    /// Conflicting state (room full, duplicate share, version mismatch)
    #[error("{0}")]
    Conflict(String),

    /// Missing or invalid credential
    #[error("Authentication required")]
    Unauthenticated,

    /// Account is temporarily locked
    #[error("Account temporarily locked")]
    AccountLocked,

    /// Persistence failure
    #[error("Internal storage error")]
    Storage(#[from] sqlx::Error),
}

impl ApiError {
    /// Convenience constructor for validation failures
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    /// Convenience constructor for missing entities
    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    /// Convenience constructor for authorization failures
    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    /// Convenience constructor for state conflicts
    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::AccountLocked => StatusCode::LOCKED,
            ApiError::Storage(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-safe message for this error
    pub fn message(&self) -> String {
        match self {
            // Never leak driver detail to the wire
            ApiError::Storage(sqlx::Error::RowNotFound) => "Resource not found".to_string(),
            ApiError::Storage(_) => "Internal storage error".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_taxonomy() {
        assert_eq!(
            ApiError::validation("empty name").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::not_found("no such room").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::forbidden("not a member").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::conflict("room full").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Unauthenticated.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::AccountLocked.status_code(), StatusCode::LOCKED);
    }

    #[test]
    fn test_row_not_found_maps_to_404() {
        let err = ApiError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "Resource not found");
    }

    #[test]
    fn test_storage_error_hides_detail() {
        let err = ApiError::from(sqlx::Error::PoolClosed);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Internal storage error");
    }

    #[test]
    fn test_message_carries_caller_text() {
        let err = ApiError::conflict("Room is full");
        assert_eq!(err.message(), "Room is full");
    }
}
