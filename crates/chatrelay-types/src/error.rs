use thiserror::Error;

/// Errors from session store backends (used by trait definitions in chatrelay-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// A malformed or out-of-range chat request, rejected before relaying.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("'{0}' must not be empty")]
    Empty(&'static str),

    #[error("'{field}' out of range: {detail}")]
    OutOfRange { field: &'static str, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_validation_error_display() {
        assert_eq!(
            ValidationError::Empty("message").to_string(),
            "'message' must not be empty"
        );
        let err = ValidationError::OutOfRange {
            field: "max_tokens",
            detail: "0 is outside 1..=4000".to_string(),
        };
        assert!(err.to_string().starts_with("'max_tokens' out of range"));
    }
}
