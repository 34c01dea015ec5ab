//! Unit-of-work store abstraction
//!
//! Every ledger operation runs inside exactly one [`UnitOfWork`] obtained from a
//! [`LedgerStore`]. Nothing written through a unit of work is visible to other
//! units of work until [`UnitOfWork::commit`] returns; dropping it without a
//! commit discards every write.
//!
//! The repository traits are split per aggregate so the PostgreSQL
//! implementation can live next to its SQL in `repos/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use mlmart_types::{ItemStatus, OrderStatus, TransactionStatus};

use crate::{
    DbOrder, DbOrderItem, DbResult, DbUser, DbWallet, DbWalletTransaction, NewOrder,
    NewOrderItem, NewUser, NewWalletTransaction,
};

/// Member lookups and registration
#[async_trait]
pub trait UserRepository: Send {
    /// Insert a member. Duplicate phone or referral code is [`crate::DbError::Duplicate`].
    async fn insert_user(&mut self, user: &NewUser) -> DbResult<DbUser>;

    async fn find_user(&mut self, id: Uuid) -> DbResult<Option<DbUser>>;

    async fn find_user_by_referral_code(&mut self, code: &str) -> DbResult<Option<DbUser>>;

    async fn find_user_by_phone(&mut self, phone: &str) -> DbResult<Option<DbUser>>;

    /// Direct sponsor of a member. `None` if the member has none or does not exist.
    async fn sponsor_of(&mut self, user_id: Uuid) -> DbResult<Option<Uuid>>;

    /// Seller-side recruiter of a member. `None` if absent.
    async fn seller_recruiter_of(&mut self, user_id: Uuid) -> DbResult<Option<Uuid>>;
}

/// Wallet balances and the append-only transaction log
#[async_trait]
pub trait WalletRepository: Send {
    async fn insert_wallet(&mut self, user_id: Uuid) -> DbResult<DbWallet>;

    async fn find_wallet_by_user(&mut self, user_id: Uuid) -> DbResult<Option<DbWallet>>;

    /// Atomically add `amount` to `balance_cash`.
    ///
    /// Must be a single increment under the row lock, never read-modify-write.
    async fn credit_cash(&mut self, wallet_id: Uuid, amount: Decimal) -> DbResult<DbWallet>;

    async fn insert_transaction(
        &mut self,
        tx: &NewWalletTransaction,
    ) -> DbResult<DbWalletTransaction>;

    /// Transaction log of a wallet, newest first
    async fn list_transactions(
        &mut self,
        wallet_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<DbWalletTransaction>>;

    async fn list_order_transactions(
        &mut self,
        order_id: Uuid,
    ) -> DbResult<Vec<DbWalletTransaction>>;

    /// Sum of amounts of a wallet's transactions in `status`
    async fn sum_transactions(
        &mut self,
        wallet_id: Uuid,
        status: TransactionStatus,
    ) -> DbResult<Decimal>;

    /// Pending transactions, oldest unlock first, locked for this unit of work.
    ///
    /// With `due_at = Some(t)` only rows with `unlock_at <= t` are returned.
    /// Rows locked by a concurrent sweep are skipped.
    async fn lock_pending_transactions(
        &mut self,
        due_at: Option<DateTime<Utc>>,
        limit: i64,
    ) -> DbResult<Vec<DbWalletTransaction>>;

    /// Flip `pending → validated`. Returns `false` if the row was not pending.
    async fn mark_transaction_validated(
        &mut self,
        tx_id: Uuid,
        validated_at: DateTime<Utc>,
    ) -> DbResult<bool>;
}

/// Orders and their items
#[async_trait]
pub trait OrderRepository: Send {
    async fn insert_order(&mut self, order: &NewOrder) -> DbResult<DbOrder>;

    async fn insert_order_item(&mut self, item: &NewOrderItem) -> DbResult<DbOrderItem>;

    async fn find_order(&mut self, id: Uuid) -> DbResult<Option<DbOrder>>;

    async fn find_order_item(&mut self, id: Uuid) -> DbResult<Option<DbOrderItem>>;

    async fn order_items(&mut self, order_id: Uuid) -> DbResult<Vec<DbOrderItem>>;

    async fn items_by_seller_and_status(
        &mut self,
        seller_id: Uuid,
        status: ItemStatus,
    ) -> DbResult<Vec<DbOrderItem>>;

    /// Conditional status change: applied only if the current status is in `from`.
    ///
    /// Returns the updated order, or `None` when no row matched. Moving to
    /// `completed` also stamps `commissions_distributed_at`.
    async fn transition_order(
        &mut self,
        order_id: Uuid,
        from: &[OrderStatus],
        to: OrderStatus,
    ) -> DbResult<Option<DbOrder>>;

    async fn mark_shipping_paid(&mut self, order_id: Uuid) -> DbResult<()>;

    /// Set the status of every item of an order. Returns the number of rows changed.
    async fn set_order_items_status(
        &mut self,
        order_id: Uuid,
        status: ItemStatus,
    ) -> DbResult<u64>;

    /// Conditional item status change. Returns `false` if the item was not in `from`.
    async fn transition_item(
        &mut self,
        item_id: Uuid,
        from: ItemStatus,
        to: ItemStatus,
    ) -> DbResult<bool>;
}

/// One atomic unit of work over all repositories
#[async_trait]
pub trait UnitOfWork: UserRepository + WalletRepository + OrderRepository + Send {
    async fn commit(self) -> DbResult<()>;

    async fn rollback(self) -> DbResult<()>;
}

/// Source of units of work
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    type Tx: UnitOfWork + 'static;

    async fn begin(&self) -> DbResult<Self::Tx>;
}
