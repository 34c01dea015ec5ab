//! Ledger error types

use mlmart_db::DbError;
use mlmart_types::TypesError;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by ledger operations
///
/// Payout validation failures and re-entrant delivery confirmations are not
/// errors; see [`crate::PayoutOutcome`] and [`crate::DeliveryOutcome`].
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("Order item not found: {0}")]
    OrderItemNotFound(Uuid),

    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("Wallet not found for user {0}")]
    WalletNotFound(Uuid),

    #[error("Cannot move {entity} {id} from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        id: Uuid,
        from: String,
        to: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Corrupt record: {0}")]
    CorruptRecord(#[from] TypesError),

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

impl LedgerError {
    /// Whether retrying the whole operation may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_retryable(),
            _ => false,
        }
    }

    pub(crate) fn invalid_transition(
        entity: &'static str,
        id: Uuid,
        from: impl ToString,
        to: impl ToString,
    ) -> Self {
        Self::InvalidTransition {
            entity,
            id,
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_follows_storage() {
        let err = LedgerError::from(DbError::Transaction("aborted".to_string()));
        assert!(err.is_retryable());

        let err = LedgerError::from(DbError::Duplicate("phone".to_string()));
        assert!(!err.is_retryable());

        assert!(!LedgerError::OrderNotFound(Uuid::nil()).is_retryable());
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = LedgerError::invalid_transition("order", Uuid::nil(), "cancelled", "completed");
        assert_eq!(
            err.to_string(),
            format!("Cannot move order {} from cancelled to completed", Uuid::nil())
        );
    }
}
