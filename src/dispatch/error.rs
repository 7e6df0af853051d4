//! Request-time failures raised by middleware and handlers.

use std::fmt::Display;

use crate::validation::schema::ValidationFailure;

/// Failure that unwinds through the middleware chain to the outer boundary.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// Input rejected by a schema; answered with 400.
    #[error("{0}")]
    Validation(ValidationFailure),

    /// Handler-signalled missing resource; answered with 404.
    #[error("not found")]
    NotFound,

    /// Anything else; logged and answered with 500.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl RouteError {
    pub fn internal(message: impl Display) -> Self {
        RouteError::Internal(anyhow::anyhow!("{message}"))
    }
}

impl From<ValidationFailure> for RouteError {
    fn from(failure: ValidationFailure) -> Self {
        RouteError::Validation(failure)
    }
}
