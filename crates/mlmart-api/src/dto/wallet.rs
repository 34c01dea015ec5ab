//! Wallet and settlement DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use mlmart_db::DbWalletTransaction;
use mlmart_ledger::SettleScope;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub direction: String,
    pub amount: Decimal,
    pub category: String,
    pub description: String,
    pub status: String,
    pub unlock_at: DateTime<Utc>,
    pub order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validated_at: Option<DateTime<Utc>>,
}

impl From<DbWalletTransaction> for TransactionResponse {
    fn from(tx: DbWalletTransaction) -> Self {
        Self {
            id: tx.id,
            direction: tx.direction,
            amount: tx.amount,
            category: tx.category,
            description: tx.description,
            status: tx.status,
            unlock_at: tx.unlock_at,
            order_id: tx.order_id,
            created_at: tx.created_at,
            validated_at: tx.validated_at,
        }
    }
}

/// Wallet history query
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct HistoryQuery {
    #[validate(range(min = 1, max = 500, message = "Limit must be 1-500"))]
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[validate(range(min = 0, message = "Offset must not be negative"))]
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Settlement mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettleMode {
    /// Holds expired at `as_of` (default now)
    Due,
    /// Every pending transaction
    All,
}

/// Administrative settlement request
#[derive(Debug, Clone, Deserialize)]
pub struct SettleRequest {
    pub mode: SettleMode,
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
}

impl SettleRequest {
    pub fn scope(&self, now: DateTime<Utc>) -> SettleScope {
        match self.mode {
            SettleMode::Due => SettleScope::Due(self.as_of.unwrap_or(now)),
            SettleMode::All => SettleScope::All,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleResponse {
    pub mode: SettleMode,
    pub settled: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_scope() {
        let now = Utc::now();
        let req: SettleRequest = serde_json::from_str(r#"{"mode":"all"}"#).unwrap();
        assert_eq!(req.scope(now), SettleScope::All);

        let req: SettleRequest = serde_json::from_str(r#"{"mode":"due"}"#).unwrap();
        assert_eq!(req.scope(now), SettleScope::Due(now));
    }

    #[test]
    fn test_history_defaults() {
        let query: HistoryQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.limit, 50);
        assert_eq!(query.offset, 0);
        assert!(query.validate().is_ok());
    }
}
