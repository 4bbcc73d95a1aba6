// ABOUTME: The engine-wide error taxonomy with HTTP status and wire-code mapping
// ABOUTME: Implements axum IntoResponse so handlers can return EngineResult directly
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Error Taxonomy
//!
//! One enum covers every failure the engine can surface. Each variant maps
//! to a stable wire code and an HTTP status; handlers return
//! [`EngineResult`] and the [`axum::response::IntoResponse`] impl produces
//! the JSON error body. `CommitFailure` is deliberately distinct from
//! placement failure so a caller can tell that a valid schedule was
//! produced but not saved.

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every failure the engine surfaces to callers
#[derive(Debug, Error)]
pub enum EngineError {
    /// The caller presented no valid bearer credential
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The OAuth state parameter failed strict decoding
    #[error("oauth state is invalid or expired")]
    InvalidState,

    /// The user has no linked calendar account
    #[error("no calendar account connected")]
    NotConnected,

    /// The request is malformed or semantically invalid
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The calendar or planning provider failed or is unreachable
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// A task could not be fully placed into the free windows
    #[error("insufficient capacity: task '{task}' has {remaining_minutes} unplaced minutes")]
    InsufficientCapacity {
        task: String,
        remaining_minutes: i64,
    },

    /// The service credential could not be used for signing
    #[error("service credential malformed: {0}")]
    CredentialMalformed(String),

    /// The jwt-bearer assertion exchange was rejected or unreachable
    #[error("assertion exchange failed: {0}")]
    AssertionExchangeFailed(String),

    /// A valid schedule was produced but persisting it failed
    #[error("plan commit failed: {0}")]
    CommitFailure(String),

    /// A storage operation failed
    #[error("database error: {0}")]
    Database(String),

    /// An unexpected internal failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Stable wire code for this error
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "unauthenticated",
            Self::InvalidState => "invalid_state",
            Self::NotConnected => "not_connected",
            Self::InvalidInput(_) => "invalid_input",
            Self::ProviderUnavailable(_) => "provider_unavailable",
            Self::InsufficientCapacity { .. } => "insufficient_capacity",
            Self::CredentialMalformed(_) => "credential_malformed",
            Self::AssertionExchangeFailed(_) => "assertion_exchange_failed",
            Self::CommitFailure(_) => "commit_failure",
            Self::Database(_) => "database_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// HTTP status this error maps to
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::InvalidState | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotConnected => StatusCode::CONFLICT,
            Self::ProviderUnavailable(_) | Self::AssertionExchangeFailed(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::InsufficientCapacity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::CredentialMalformed(_)
            | Self::CommitFailure(_)
            | Self::Database(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// JSON error body: `{"error": {"code", "message"}}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "{self}");
        } else {
            tracing::debug!(code = self.code(), "{self}");
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code().to_owned(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Engine-wide result alias
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            EngineError::Unauthenticated("x".into()).http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(EngineError::InvalidState.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(EngineError::NotConnected.http_status(), StatusCode::CONFLICT);
        assert_eq!(
            EngineError::ProviderUnavailable("x".into()).http_status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            EngineError::InsufficientCapacity {
                task: "A".into(),
                remaining_minutes: 30
            }
            .http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            EngineError::CommitFailure("x".into()).http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn capacity_error_names_the_task() {
        let err = EngineError::InsufficientCapacity {
            task: "Write report".into(),
            remaining_minutes: 45,
        };
        assert_eq!(err.code(), "insufficient_capacity");
        assert!(err.to_string().contains("Write report"));
        assert!(err.to_string().contains("45"));
    }
}
