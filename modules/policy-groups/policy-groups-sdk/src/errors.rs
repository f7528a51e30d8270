//! Public error types for the policy-groups module.
//!
//! These errors are safe to expose to other modules and consumers.

use thiserror::Error;

/// Errors that can be returned by the [`PolicyGroupsClient`].
///
/// [`PolicyGroupsClient`]: crate::api::PolicyGroupsClient
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyGroupsError {
    /// The association (or a prerequisite on a read path) does not exist.
    #[error("{message}")]
    NotFound { message: String },

    /// The submitted document failed structural validation.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// The authorization engine denied at least one required check.
    #[error("Access denied")]
    Forbidden,

    /// A concurrent creation raced on a unique natural key.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// An internal error occurred.
    #[error("Internal error")]
    Internal,
}

impl PolicyGroupsError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn forbidden() -> Self {
        Self::Forbidden
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::Internal
    }
}

/// Errors from the authorization engine collaborator.
///
/// These represent infrastructure/transport failures only. Denial is
/// expressed via [`Verdict::Denied`], not as an error variant.
///
/// [`Verdict::Denied`]: crate::models::Verdict::Denied
#[derive(Debug, Error)]
pub enum AuthzEngineError {
    /// The engine could not be reached or is not ready.
    #[error("authorization engine unavailable: {0}")]
    Unavailable(String),

    /// An internal engine error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}
