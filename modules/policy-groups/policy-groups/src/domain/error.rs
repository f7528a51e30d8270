use policy_groups_sdk::{AuthzEngineError, PolicyGroupsError};
use thiserror::Error;

use super::validate::ValidationError;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{message}")]
    NotFound { message: String },

    #[error("Access denied")]
    Forbidden,

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Authorization engine failure: {message}")]
    AuthzEngine { message: String },

    #[error("Database error: {message}")]
    Database { message: String },

    /// A (verb, existence-state) combination outside the decision
    /// table, or a storage integrity breach. Never a client error.
    #[error("Unexpected state: {message}")]
    UnexpectedState { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn unexpected_state(message: impl Into<String>) -> Self {
        Self::UnexpectedState {
            message: message.into(),
        }
    }
}

impl From<AuthzEngineError> for DomainError {
    fn from(e: AuthzEngineError) -> Self {
        Self::AuthzEngine {
            message: e.to_string(),
        }
    }
}

/// Convert domain errors to SDK errors for public API consumption.
impl From<DomainError> for PolicyGroupsError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(v) => PolicyGroupsError::validation(v.to_string()),
            DomainError::NotFound { message } => PolicyGroupsError::not_found(message),
            DomainError::Forbidden => PolicyGroupsError::forbidden(),
            DomainError::Conflict { message } => PolicyGroupsError::conflict(message),
            DomainError::AuthzEngine { .. }
            | DomainError::Database { .. }
            | DomainError::UnexpectedState { .. } => PolicyGroupsError::internal(),
        }
    }
}
