//! Wallet and wallet-transaction repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use mlmart_types::TransactionStatus;

use super::PgUnitOfWork;
use crate::{
    DbError, DbResult, DbWallet, DbWalletTransaction, NewWalletTransaction, WalletRepository,
    BALANCE_TYPE_CASH,
};

const WALLET_COLUMNS: &str = "id, user_id, balance_cash, balance_bonus, created_at, updated_at";

const TRANSACTION_COLUMNS: &str = "id, wallet_id, type, amount, balance_type, category, \
     description, status, unlock_at, order_id, created_at, validated_at";

#[async_trait]
impl WalletRepository for PgUnitOfWork {
    async fn insert_wallet(&mut self, user_id: Uuid) -> DbResult<DbWallet> {
        let sql = format!(
            "INSERT INTO wallets (user_id) VALUES ($1) RETURNING {WALLET_COLUMNS}"
        );
        let wallet = sqlx::query_as::<_, DbWallet>(&sql)
            .bind(user_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e {
                    if db_err.constraint() == Some("wallets_user_id_key") {
                        return DbError::Duplicate(format!("User {} already has a wallet", user_id));
                    }
                }
                DbError::Query(e)
            })?;

        Ok(wallet)
    }

    async fn find_wallet_by_user(&mut self, user_id: Uuid) -> DbResult<Option<DbWallet>> {
        let sql = format!("SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = $1");
        let wallet = sqlx::query_as::<_, DbWallet>(&sql)
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(wallet)
    }

    async fn credit_cash(&mut self, wallet_id: Uuid, amount: Decimal) -> DbResult<DbWallet> {
        if amount <= Decimal::ZERO {
            return Err(DbError::InvalidInput("Credit amount must be positive".to_string()));
        }

        // Single-statement increment: takes the row lock, serializes concurrent credits
        let sql = format!(
            r#"
            UPDATE wallets
            SET balance_cash = balance_cash + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {WALLET_COLUMNS}
            "#
        );
        let wallet = sqlx::query_as::<_, DbWallet>(&sql)
            .bind(wallet_id)
            .bind(amount)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("Wallet {}", wallet_id)))?;

        Ok(wallet)
    }

    async fn insert_transaction(
        &mut self,
        tx: &NewWalletTransaction,
    ) -> DbResult<DbWalletTransaction> {
        let validated_at = match tx.status {
            TransactionStatus::Validated => Some(Utc::now()),
            TransactionStatus::Pending => None,
        };

        let sql = format!(
            r#"
            INSERT INTO wallet_transactions
                (wallet_id, type, amount, balance_type, category, description,
                 status, unlock_at, order_id, validated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {TRANSACTION_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, DbWalletTransaction>(&sql)
            .bind(tx.wallet_id)
            .bind(tx.direction.as_str())
            .bind(tx.amount)
            .bind(BALANCE_TYPE_CASH)
            .bind(tx.category.as_str())
            .bind(&tx.description)
            .bind(tx.status.as_str())
            .bind(tx.unlock_at)
            .bind(tx.order_id)
            .bind(validated_at)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(row)
    }

    async fn list_transactions(
        &mut self,
        wallet_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<DbWalletTransaction>> {
        let sql = format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM wallet_transactions
            WHERE wallet_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        );
        let rows = sqlx::query_as::<_, DbWalletTransaction>(&sql)
            .bind(wallet_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows)
    }

    async fn list_order_transactions(
        &mut self,
        order_id: Uuid,
    ) -> DbResult<Vec<DbWalletTransaction>> {
        let sql = format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM wallet_transactions
            WHERE order_id = $1
            ORDER BY created_at, id
            "#
        );
        let rows = sqlx::query_as::<_, DbWalletTransaction>(&sql)
            .bind(order_id)
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows)
    }

    async fn sum_transactions(
        &mut self,
        wallet_id: Uuid,
        status: TransactionStatus,
    ) -> DbResult<Decimal> {
        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM wallet_transactions
            WHERE wallet_id = $1 AND status = $2
            "#,
        )
        .bind(wallet_id)
        .bind(status.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(total)
    }

    async fn lock_pending_transactions(
        &mut self,
        due_at: Option<DateTime<Utc>>,
        limit: i64,
    ) -> DbResult<Vec<DbWalletTransaction>> {
        let sql = format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM wallet_transactions
            WHERE status = 'pending'
              AND ($1::timestamptz IS NULL OR unlock_at <= $1)
            ORDER BY unlock_at, id
            LIMIT $2
            FOR UPDATE SKIP LOCKED
            "#
        );
        let rows = sqlx::query_as::<_, DbWalletTransaction>(&sql)
            .bind(due_at)
            .bind(limit)
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows)
    }

    async fn mark_transaction_validated(
        &mut self,
        tx_id: Uuid,
        validated_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE wallet_transactions
            SET status = 'validated', validated_at = $2
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(tx_id)
        .bind(validated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
