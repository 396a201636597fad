use thiserror::Error;

use pantry_core::errors::DomainError;
use pantry_db::repositories::RepositoryError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            Self::Domain(error) => Some(error),
            _ => None,
        }
    }
}

/// Lift a domain result into a service result. Internal-consistency
/// failures are the one kind logged as unexpected; everything else is an
/// expected outcome and stays quiet.
pub(crate) fn from_domain<T>(result: Result<T, DomainError>) -> Result<T, ServiceError> {
    result.map_err(|error| {
        if error.is_internal() {
            tracing::error!(
                event_name = "orders.internal_consistency",
                error = %error,
                "internal consistency violation"
            );
        }
        ServiceError::Domain(error)
    })
}
