use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum DomainError {
    #[error("validation failed for '{field}': {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },

    #[error("resource not found: {0}")]
    NotFound(String),

    /// Connection, constraint, timeout or query failure. Conflicts on the
    /// unique public identifier land here as well.
    #[error("storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub(crate) fn is_not_found(&self) -> bool {
        matches!(self, DomainError::NotFound(_))
    }
}
