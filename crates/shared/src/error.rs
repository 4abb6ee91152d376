//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflict (e.g., duplicate entry or an illegal repeated transition).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Concurrent update lost a lock race; the caller may retry.
    #[error("Concurrency conflict: {0}")]
    Concurrency(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::Conflict(_) | Self::Concurrency(_) => 409,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Concurrency(_) => "CONCURRENCY_CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if repeating the operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Concurrency(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::NotFound(String::new()), 404, "NOT_FOUND")]
    #[case(AppError::Validation(String::new()), 400, "VALIDATION_ERROR")]
    #[case(AppError::Conflict(String::new()), 409, "CONFLICT")]
    #[case(AppError::Concurrency(String::new()), 409, "CONCURRENCY_CONFLICT")]
    #[case(AppError::Database(String::new()), 500, "DATABASE_ERROR")]
    #[case(AppError::Internal(String::new()), 500, "INTERNAL_ERROR")]
    fn test_status_and_code(#[case] err: AppError, #[case] status: u16, #[case] code: &str) {
        assert_eq!(err.status_code(), status);
        assert_eq!(err.error_code(), code);
    }

    #[test]
    fn test_only_concurrency_is_retryable() {
        assert!(AppError::Concurrency("lock".into()).is_retryable());
        assert!(!AppError::Conflict("dup".into()).is_retryable());
        assert!(!AppError::Database("down".into()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            AppError::NotFound("msg".into()).to_string(),
            "Not found: msg"
        );
        assert_eq!(
            AppError::Validation("msg".into()).to_string(),
            "Validation error: msg"
        );
        assert_eq!(
            AppError::Conflict("msg".into()).to_string(),
            "Conflict: msg"
        );
    }
}
