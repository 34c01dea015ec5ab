//! Database error types

use thiserror::Error;

/// Database operation errors
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Transaction error: {0}")]
    Transaction(String),
}

impl DbError {
    /// Whether the failed unit of work may succeed if simply retried.
    ///
    /// Covers lost connections, pool exhaustion, serialization failures
    /// (`40001`) and deadlocks (`40P01`).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Transaction(_) => true,
            Self::Query(err) => match err {
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => true,
                sqlx::Error::Database(db_err) => {
                    matches!(db_err.code().as_deref(), Some("40001") | Some("40P01"))
                }
                _ => false,
            },
            _ => false,
        }
    }
}

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(DbError::Connection("refused".to_string()).is_retryable());
        assert!(DbError::Query(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!DbError::Query(sqlx::Error::RowNotFound).is_retryable());
        assert!(!DbError::Duplicate("phone".to_string()).is_retryable());
        assert!(!DbError::NotFound("wallet".to_string()).is_retryable());
    }
}
