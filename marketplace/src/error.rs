//! Marketplace error taxonomy.
//!
//! Reducers record a [`MarketError`] in `last_error`; services return it; the
//! HTTP layer turns it into the JSON error envelope through [`AppError`].

use librix_runtime::RunnerError;
use librix_web::AppError;
use thiserror::Error;

/// Errors raised by marketplace operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketError {
    /// Referenced record does not exist
    #[error("{resource} with id {id} not found")]
    NotFound {
        /// Kind of record ("Order", "Book", ...)
        resource: &'static str,
        /// Requested id
        id: String,
    },

    /// Malformed or missing input
    #[error("{0}")]
    Validation(String),

    /// Operation not allowed from the record's current status
    #[error("{0}")]
    InvalidTransition(String),

    /// Missing or invalid credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but not the party allowed to do this
    #[error("{0}")]
    Forbidden(String),

    /// Persistence failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Anything else that should not happen
    #[error("internal error: {0}")]
    Internal(String),
}

impl MarketError {
    /// Shorthand for [`MarketError::NotFound`]
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Short label for metrics
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Validation(_) => "validation",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::Storage(_) => "storage",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<RunnerError> for MarketError {
    fn from(error: RunnerError) -> Self {
        Self::Internal(error.to_string())
    }
}

impl From<MarketError> for AppError {
    fn from(error: MarketError) -> Self {
        match error {
            MarketError::NotFound { resource, id } => Self::not_found(resource, id),
            MarketError::Validation(message) => Self::validation(message),
            MarketError::InvalidTransition(message) => Self::conflict(message),
            MarketError::Unauthorized(message) => Self::unauthorized(message),
            MarketError::Forbidden(message) => Self::forbidden(message),
            error @ (MarketError::Storage(_) | MarketError::Internal(_)) => {
                Self::internal("Internal server error").with_source(anyhow::Error::new(error))
            },
        }
    }
}

/// Result alias for marketplace operations
pub type MarketResult<T> = Result<T, MarketError>;
