//! Marketplace rule violations.
//!
//! Raised by entity transitions and the access policy. Storage and transport
//! failures live in `common::AppError`.

use thiserror::Error;

/// A rule of the marketplace was broken.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or out-of-range input
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The acting profile has not been completed yet (guest or unnamed)
    #[error("Profile is not loaded yet")]
    ProfileIncomplete,

    /// The actor lacks the role or ownership the action requires
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Named record does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// The action was already performed or collides with existing state
    #[error("{0}")]
    Conflict(String),

    /// Escrow for the contract was already released
    #[error("Funds already released")]
    AlreadyReleased,

    /// The entity is not in a state that allows the transition
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

impl DomainError {
    pub fn validation(reason: impl Into<String>) -> Self {
        DomainError::Validation(reason.into())
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        DomainError::Forbidden(reason.into())
    }

    pub fn not_found(entity: impl Into<String>) -> Self {
        DomainError::NotFound(entity.into())
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        DomainError::Conflict(reason.into())
    }

    pub fn invalid_transition(reason: impl Into<String>) -> Self {
        DomainError::InvalidTransition(reason.into())
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
