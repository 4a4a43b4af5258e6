//! Error types for governance operations
//!
//! This module defines the error taxonomy every service operation returns.
//! Errors are stable and typed; the action layer maps them to messages.

use governance_org::HierarchyError;
use thiserror::Error;

/// Governance error types.
///
/// Every service operation fails fast with one of these and leaves storage
/// untouched (the surrounding transaction is rolled back).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GovernanceError {
    /// Malformed input or a reference that does not fit the operation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Referenced entity is absent or soft-deleted
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity looked up
        entity: &'static str,
        /// Identifier that did not resolve
        id: String,
    },

    /// Uniqueness or protection rule violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No current user
    #[error("Not authenticated")]
    Unauthenticated,

    /// Current user may not perform the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Stored data breaks a structural invariant
    #[error("Consistency error: {0}")]
    Consistency(String),

    /// Storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for governance operations.
pub type GovernanceResult<T> = Result<T, GovernanceError>;

impl GovernanceError {
    /// Build a `NotFound` error.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        GovernanceError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Build a `Validation` error.
    pub fn validation(message: impl Into<String>) -> Self {
        GovernanceError::Validation(message.into())
    }

    /// Build a `Conflict` error.
    pub fn conflict(message: impl Into<String>) -> Self {
        GovernanceError::Conflict(message.into())
    }

    /// Check if this error should be logged at error level.
    ///
    /// Validation, lookup and conflict failures are expected outcomes of
    /// user input and are not server errors.
    pub fn is_server_error(&self) -> bool {
        matches!(self, GovernanceError::Consistency(_) | GovernanceError::Storage(_))
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GovernanceError::Validation(_) => 400,
            GovernanceError::NotFound { .. } => 404,
            GovernanceError::Conflict(_) => 409,
            GovernanceError::Unauthenticated => 401,
            GovernanceError::Unauthorized(_) => 403,
            GovernanceError::Consistency(_) | GovernanceError::Storage(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            GovernanceError::Validation(_) => "VALIDATION_ERROR",
            GovernanceError::NotFound { .. } => "NOT_FOUND",
            GovernanceError::Conflict(_) => "CONFLICT",
            GovernanceError::Unauthenticated => "UNAUTHENTICATED",
            GovernanceError::Unauthorized(_) => "UNAUTHORIZED",
            GovernanceError::Consistency(_) => "CONSISTENCY_ERROR",
            GovernanceError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl From<HierarchyError> for GovernanceError {
    fn from(err: HierarchyError) -> Self {
        GovernanceError::Consistency(err.to_string())
    }
}
