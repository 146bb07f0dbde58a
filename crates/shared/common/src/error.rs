//! Unified error handling for the marketplace.
//!
//! A single error type shared by the services and the HTTP gateway. Domain
//! rule violations convert into it losslessly; infrastructure failures are
//! logged and hidden behind a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Every failure a service or handler can surface.
#[derive(Debug, Error)]
pub enum AppError {
    // Session & access
    #[error("Missing or invalid session")]
    Unauthorized,

    #[error("Email or password is incorrect")]
    InvalidCredentials,

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Profile is not loaded yet")]
    ProfileIncomplete,

    // Records & lifecycle
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Funds already released")]
    AlreadyReleased,

    #[error("{0}")]
    InvalidTransition(String),

    /// The record changed between read and write; the caller may retry
    #[error("Record was modified concurrently")]
    StaleWrite,

    // Input
    #[error("{0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    // Infrastructure
    #[cfg(feature = "database")]
    #[error("Store unavailable")]
    Database(#[from] sea_orm::DbErr),

    #[cfg(feature = "jwt")]
    #[error("Session token rejected")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Serialization error")]
    Serialization(#[from] serde_json::Error),

    #[error("Unexpected failure")]
    Internal(String),
}

/// `{ "error": { "code", "message" } }`
#[derive(Serialize)]
struct Envelope {
    error: Detail,
}

#[derive(Serialize)]
struct Detail {
    code: &'static str,
    message: String,
}

impl AppError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::ProfileIncomplete => "PROFILE_INCOMPLETE",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::AlreadyReleased => "ALREADY_RELEASED",
            AppError::InvalidTransition(_) => "INVALID_TRANSITION",
            AppError::StaleWrite => "STALE_WRITE",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            #[cfg(feature = "database")]
            AppError::Database(_) => "DATABASE_ERROR",
            #[cfg(feature = "jwt")]
            AppError::Jwt(_) => "AUTH_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            #[cfg(feature = "jwt")]
            AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_)
            | AppError::AlreadyReleased
            | AppError::InvalidTransition(_)
            | AppError::StaleWrite => StatusCode::CONFLICT,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ProfileIncomplete => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show a client; infrastructure causes are logged instead
    pub fn user_message(&self) -> String {
        match self {
            #[cfg(feature = "database")]
            AppError::Database(e) => {
                tracing::error!(error = ?e, "document store failure");
                "The marketplace store is unavailable".to_string()
            }
            #[cfg(feature = "jwt")]
            AppError::Jwt(e) => {
                tracing::debug!(error = ?e, "session token rejected");
                "Session expired or invalid".to_string()
            }
            AppError::Serialization(e) => {
                tracing::error!(error = ?e, "undecodable record");
                "A stored record could not be read".to_string()
            }
            AppError::Internal(detail) => {
                tracing::error!(%detail, "unexpected failure");
                "Something went wrong on our side".to_string()
            }

            _ => self.to_string(),
        }
    }

    /// Whether the failure came from a lost optimistic-concurrency race
    pub fn is_stale_write(&self) -> bool {
        matches!(self, AppError::StaleWrite)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let envelope = Envelope {
            error: Detail {
                code: self.code(),
                message: self.user_message(),
            },
        };

        (self.status(), Json(envelope)).into_response()
    }
}

impl From<DomainError> for AppError {
    fn from(rule: DomainError) -> Self {
        match rule {
            DomainError::Validation(msg) => AppError::Validation(msg),
            DomainError::ProfileIncomplete => AppError::ProfileIncomplete,
            DomainError::Forbidden(reason) => AppError::Forbidden(reason),
            DomainError::NotFound(entity) => AppError::NotFound(entity),
            DomainError::Conflict(reason) => AppError::Conflict(reason),
            DomainError::AlreadyReleased => AppError::AlreadyReleased,
            DomainError::InvalidTransition(reason) => AppError::InvalidTransition(reason),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Turn a missing lookup into `NotFound`
pub trait OptionExt<T> {
    fn ok_or_not_found(self, entity: &str) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, entity: &str) -> AppResult<T> {
        self.ok_or_else(|| AppError::NotFound(entity.to_string()))
    }
}

impl AppError {
    pub fn conflict(reason: impl Into<String>) -> Self {
        AppError::Conflict(reason.into())
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        AppError::Forbidden(reason.into())
    }

    pub fn not_found(entity: impl Into<String>) -> Self {
        AppError::NotFound(entity.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        AppError::Internal(detail.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_keep_their_reason() {
        let err: AppError = DomainError::forbidden("only admins can moderate users").into();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.user_message(), "Access denied: only admins can moderate users");

        let err: AppError = DomainError::AlreadyReleased.into();
        assert_eq!(err.code(), "ALREADY_RELEASED");
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn internal_details_are_hidden() {
        let err = AppError::internal("connection pool exhausted");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "Something went wrong on our side");
    }

    #[test]
    fn missing_record_names_the_entity() {
        let err = None::<u8>.ok_or_not_found("Contract").unwrap_err();
        assert_eq!(err.to_string(), "Contract not found");
    }
}
