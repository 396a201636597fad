use thiserror::Error;

/// Outcome taxonomy shared by every core operation. All variants except
/// `InternalConsistency` are expected, user-facing results; callers map them
/// onto their transport. `InternalConsistency` signals corrupted state
/// (cyclic department tree, violated storage invariant) and is the only kind
/// worth logging as unexpected.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("internal consistency violation: {0}")]
    InternalConsistency(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict(reason.into())
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::InternalConsistency(reason.into())
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::InternalConsistency(_))
    }
}

#[cfg(test)]
mod tests {
    use super::DomainError;

    #[test]
    fn not_found_names_entity_and_id() {
        let error = DomainError::not_found("order", "ord-17");
        assert_eq!(error.to_string(), "order `ord-17` not found");
    }

    #[test]
    fn only_internal_consistency_counts_as_internal() {
        assert!(DomainError::internal("cyclic tree").is_internal());
        assert!(!DomainError::forbidden("no reach").is_internal());
        assert!(!DomainError::conflict("already sent").is_internal());
        assert!(!DomainError::validation("bad quantity").is_internal());
    }
}
