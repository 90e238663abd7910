//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! mostly validation failures when constructing documents and paths.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A document was constructed without a title
    #[error("Document has no title")]
    MissingTitle,

    /// Invalid path format or content
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidPath("../escape".to_string());
        assert_eq!(err.to_string(), "Invalid path: ../escape");

        assert_eq!(DomainError::MissingTitle.to_string(), "Document has no title");
    }

    #[test]
    fn test_error_equality() {
        let err1 = DomainError::ValidationFailed("a".to_string());
        let err2 = DomainError::ValidationFailed("a".to_string());
        let err3 = DomainError::ValidationFailed("b".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
