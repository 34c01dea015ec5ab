//! In-memory store for tests and local runs
//!
//! `begin()` takes an exclusive lock on the shared state and works on a copy of
//! it; `commit()` swaps the copy back in. Dropping a unit of work without
//! committing leaves the shared state untouched, which gives the same
//! all-or-nothing visibility as a database transaction. Units of work are fully
//! serialized.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use mlmart_types::{ItemStatus, OrderStatus, ShippingPaymentStatus, TransactionStatus};

use crate::{
    DbError, DbOrder, DbOrderItem, DbResult, DbUser, DbWallet, DbWalletTransaction, LedgerStore,
    NewOrder, NewOrderItem, NewUser, NewWalletTransaction, OrderRepository, UnitOfWork,
    UserRepository, WalletRepository, BALANCE_TYPE_CASH,
};

/// Full contents of the in-memory database
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub users: HashMap<Uuid, DbUser>,
    pub wallets: HashMap<Uuid, DbWallet>,
    /// Insertion order is creation order
    pub transactions: Vec<DbWalletTransaction>,
    pub orders: HashMap<Uuid, DbOrder>,
    pub items: Vec<DbOrderItem>,
}

/// Failure injection shared by every unit of work of a store
#[derive(Debug, Default)]
struct Faults {
    /// Fail the transaction insert once this many inserts have succeeded
    fail_insert_after: AtomicUsize,
    fail_insert_armed: AtomicBool,
    fail_next_commit: AtomicBool,
}

/// Shared in-memory store
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<Faults>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the committed state
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    /// Make the transaction insert fail after `n` successful inserts (counted per unit of work).
    pub fn fail_transaction_insert_after(&self, n: usize) {
        self.faults.fail_insert_after.store(n, Ordering::SeqCst);
        self.faults.fail_insert_armed.store(true, Ordering::SeqCst);
    }

    /// Make the next commit fail
    pub fn fail_next_commit(&self) {
        self.faults.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Clear all injected failures
    pub fn clear_faults(&self) {
        self.faults.fail_insert_armed.store(false, Ordering::SeqCst);
        self.faults.fail_next_commit.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    type Tx = MemoryUnitOfWork;

    async fn begin(&self) -> DbResult<Self::Tx> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(MemoryUnitOfWork {
            guard,
            work,
            inserts: 0,
            faults: self.faults.clone(),
        })
    }
}

/// Unit of work over a [`MemoryStore`]
pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
    inserts: usize,
    faults: Arc<Faults>,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self) -> DbResult<()> {
        if self.faults.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(DbError::Transaction("injected commit failure".to_string()));
        }
        let MemoryUnitOfWork { mut guard, work, .. } = self;
        *guard = work;
        Ok(())
    }

    async fn rollback(self) -> DbResult<()> {
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryUnitOfWork {
    async fn insert_user(&mut self, user: &NewUser) -> DbResult<DbUser> {
        if let Some(phone) = &user.phone {
            if self.work.users.values().any(|u| u.phone.as_ref() == Some(phone)) {
                return Err(DbError::Duplicate(format!("Phone {} already registered", phone)));
            }
        }
        if self
            .work
            .users
            .values()
            .any(|u| u.referral_code == user.referral_code)
        {
            return Err(DbError::Duplicate(format!(
                "Referral code {} already taken",
                user.referral_code
            )));
        }
        for link in [user.sponsor_id, user.seller_recruiter_id].into_iter().flatten() {
            if !self.work.users.contains_key(&link) {
                return Err(DbError::Constraint(format!("Referenced user {} does not exist", link)));
            }
        }

        let created = DbUser {
            id: Uuid::new_v4(),
            full_name: user.full_name.clone(),
            phone: user.phone.clone(),
            referral_code: user.referral_code.clone(),
            sponsor_id: user.sponsor_id,
            seller_recruiter_id: user.seller_recruiter_id,
            created_at: Utc::now(),
        };
        self.work.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_user(&mut self, id: Uuid) -> DbResult<Option<DbUser>> {
        Ok(self.work.users.get(&id).cloned())
    }

    async fn find_user_by_referral_code(&mut self, code: &str) -> DbResult<Option<DbUser>> {
        Ok(self
            .work
            .users
            .values()
            .find(|u| u.referral_code == code)
            .cloned())
    }

    async fn find_user_by_phone(&mut self, phone: &str) -> DbResult<Option<DbUser>> {
        Ok(self
            .work
            .users
            .values()
            .find(|u| u.phone.as_deref() == Some(phone))
            .cloned())
    }

    async fn sponsor_of(&mut self, user_id: Uuid) -> DbResult<Option<Uuid>> {
        Ok(self.work.users.get(&user_id).and_then(|u| u.sponsor_id))
    }

    async fn seller_recruiter_of(&mut self, user_id: Uuid) -> DbResult<Option<Uuid>> {
        Ok(self.work.users.get(&user_id).and_then(|u| u.seller_recruiter_id))
    }
}

#[async_trait]
impl WalletRepository for MemoryUnitOfWork {
    async fn insert_wallet(&mut self, user_id: Uuid) -> DbResult<DbWallet> {
        if !self.work.users.contains_key(&user_id) {
            return Err(DbError::Constraint(format!("User {} does not exist", user_id)));
        }
        if self.work.wallets.values().any(|w| w.user_id == user_id) {
            return Err(DbError::Duplicate(format!("User {} already has a wallet", user_id)));
        }

        let now = Utc::now();
        let wallet = DbWallet {
            id: Uuid::new_v4(),
            user_id,
            balance_cash: Decimal::ZERO,
            balance_bonus: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        self.work.wallets.insert(wallet.id, wallet.clone());
        Ok(wallet)
    }

    async fn find_wallet_by_user(&mut self, user_id: Uuid) -> DbResult<Option<DbWallet>> {
        Ok(self
            .work
            .wallets
            .values()
            .find(|w| w.user_id == user_id)
            .cloned())
    }

    async fn credit_cash(&mut self, wallet_id: Uuid, amount: Decimal) -> DbResult<DbWallet> {
        if amount <= Decimal::ZERO {
            return Err(DbError::InvalidInput("Credit amount must be positive".to_string()));
        }
        let wallet = self
            .work
            .wallets
            .get_mut(&wallet_id)
            .ok_or_else(|| DbError::NotFound(format!("Wallet {}", wallet_id)))?;
        wallet.balance_cash += amount;
        wallet.updated_at = Utc::now();
        Ok(wallet.clone())
    }

    async fn insert_transaction(
        &mut self,
        tx: &NewWalletTransaction,
    ) -> DbResult<DbWalletTransaction> {
        if self.faults.fail_insert_armed.load(Ordering::SeqCst)
            && self.inserts >= self.faults.fail_insert_after.load(Ordering::SeqCst)
        {
            return Err(DbError::Transaction("injected insert failure".to_string()));
        }
        if tx.amount <= Decimal::ZERO {
            return Err(DbError::Constraint("amount must be positive".to_string()));
        }
        if !self.work.wallets.contains_key(&tx.wallet_id) {
            return Err(DbError::Constraint(format!("Wallet {} does not exist", tx.wallet_id)));
        }

        let now = Utc::now();
        let row = DbWalletTransaction {
            id: Uuid::new_v4(),
            wallet_id: tx.wallet_id,
            direction: tx.direction.as_str().to_string(),
            amount: tx.amount,
            balance_type: BALANCE_TYPE_CASH.to_string(),
            category: tx.category.as_str().to_string(),
            description: tx.description.clone(),
            status: tx.status.as_str().to_string(),
            unlock_at: tx.unlock_at,
            order_id: tx.order_id,
            created_at: now,
            validated_at: (tx.status == TransactionStatus::Validated).then_some(now),
        };
        self.work.transactions.push(row.clone());
        self.inserts += 1;
        Ok(row)
    }

    async fn list_transactions(
        &mut self,
        wallet_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<DbWalletTransaction>> {
        Ok(self
            .work
            .transactions
            .iter()
            .rev()
            .filter(|t| t.wallet_id == wallet_id)
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn list_order_transactions(
        &mut self,
        order_id: Uuid,
    ) -> DbResult<Vec<DbWalletTransaction>> {
        Ok(self
            .work
            .transactions
            .iter()
            .filter(|t| t.order_id == Some(order_id))
            .cloned()
            .collect())
    }

    async fn sum_transactions(
        &mut self,
        wallet_id: Uuid,
        status: TransactionStatus,
    ) -> DbResult<Decimal> {
        Ok(self
            .work
            .transactions
            .iter()
            .filter(|t| t.wallet_id == wallet_id && t.status == status.as_str())
            .map(|t| t.amount)
            .sum())
    }

    async fn lock_pending_transactions(
        &mut self,
        due_at: Option<DateTime<Utc>>,
        limit: i64,
    ) -> DbResult<Vec<DbWalletTransaction>> {
        let mut due: Vec<DbWalletTransaction> = self
            .work
            .transactions
            .iter()
            .filter(|t| t.is_pending())
            .filter(|t| due_at.map_or(true, |at| t.unlock_at <= at))
            .cloned()
            .collect();
        due.sort_by_key(|t| t.unlock_at);
        due.truncate(limit.max(0) as usize);
        Ok(due)
    }

    async fn mark_transaction_validated(
        &mut self,
        tx_id: Uuid,
        validated_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        match self
            .work
            .transactions
            .iter_mut()
            .find(|t| t.id == tx_id && t.is_pending())
        {
            Some(row) => {
                row.status = TransactionStatus::Validated.as_str().to_string();
                row.validated_at = Some(validated_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl OrderRepository for MemoryUnitOfWork {
    async fn insert_order(&mut self, order: &NewOrder) -> DbResult<DbOrder> {
        if !self.work.users.contains_key(&order.buyer_id) {
            return Err(DbError::Constraint(format!("Buyer {} does not exist", order.buyer_id)));
        }

        let now = Utc::now();
        let created = DbOrder {
            id: Uuid::new_v4(),
            buyer_id: order.buyer_id,
            global_status: OrderStatus::Pending.as_str().to_string(),
            shipping_payment_status: ShippingPaymentStatus::Unpaid.as_str().to_string(),
            total_products_amount: order.total_products_amount,
            shipping_fee: order.shipping_fee,
            payment_method: order.payment_method.clone(),
            commissions_distributed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.work.orders.insert(created.id, created.clone());
        Ok(created)
    }

    async fn insert_order_item(&mut self, item: &NewOrderItem) -> DbResult<DbOrderItem> {
        if !self.work.orders.contains_key(&item.order_id) {
            return Err(DbError::Constraint(format!("Order {} does not exist", item.order_id)));
        }
        if !self.work.users.contains_key(&item.seller_id) {
            return Err(DbError::Constraint(format!("Seller {} does not exist", item.seller_id)));
        }
        if item.quantity <= 0 || item.unit_price <= Decimal::ZERO {
            return Err(DbError::Constraint(
                "quantity and unit price must be positive".to_string(),
            ));
        }

        let created = DbOrderItem {
            id: Uuid::new_v4(),
            order_id: item.order_id,
            variant_id: item.variant_id,
            seller_id: item.seller_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            item_status: ItemStatus::AwaitingPayment.as_str().to_string(),
            created_at: Utc::now(),
        };
        self.work.items.push(created.clone());
        Ok(created)
    }

    async fn find_order(&mut self, id: Uuid) -> DbResult<Option<DbOrder>> {
        Ok(self.work.orders.get(&id).cloned())
    }

    async fn find_order_item(&mut self, id: Uuid) -> DbResult<Option<DbOrderItem>> {
        Ok(self.work.items.iter().find(|i| i.id == id).cloned())
    }

    async fn order_items(&mut self, order_id: Uuid) -> DbResult<Vec<DbOrderItem>> {
        Ok(self
            .work
            .items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn items_by_seller_and_status(
        &mut self,
        seller_id: Uuid,
        status: ItemStatus,
    ) -> DbResult<Vec<DbOrderItem>> {
        Ok(self
            .work
            .items
            .iter()
            .filter(|i| i.seller_id == seller_id && i.item_status == status.as_str())
            .cloned()
            .collect())
    }

    async fn transition_order(
        &mut self,
        order_id: Uuid,
        from: &[OrderStatus],
        to: OrderStatus,
    ) -> DbResult<Option<DbOrder>> {
        let Some(order) = self.work.orders.get_mut(&order_id) else {
            return Ok(None);
        };
        if !from.iter().any(|s| s.as_str() == order.global_status) {
            return Ok(None);
        }

        let now = Utc::now();
        order.global_status = to.as_str().to_string();
        if to == OrderStatus::Completed {
            order.commissions_distributed_at = Some(now);
        }
        order.updated_at = now;
        Ok(Some(order.clone()))
    }

    async fn mark_shipping_paid(&mut self, order_id: Uuid) -> DbResult<()> {
        if let Some(order) = self.work.orders.get_mut(&order_id) {
            order.shipping_payment_status = ShippingPaymentStatus::Paid.as_str().to_string();
            order.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_order_items_status(
        &mut self,
        order_id: Uuid,
        status: ItemStatus,
    ) -> DbResult<u64> {
        let mut changed = 0;
        for item in self.work.items.iter_mut().filter(|i| i.order_id == order_id) {
            item.item_status = status.as_str().to_string();
            changed += 1;
        }
        Ok(changed)
    }

    async fn transition_item(
        &mut self,
        item_id: Uuid,
        from: ItemStatus,
        to: ItemStatus,
    ) -> DbResult<bool> {
        match self
            .work
            .items
            .iter_mut()
            .find(|i| i.id == item_id && i.item_status == from.as_str())
        {
            Some(item) => {
                item.item_status = to.as_str().to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlmart_types::{TransactionCategory, TransactionDirection};
    use rust_decimal_macros::dec;

    fn new_user(code: &str, sponsor: Option<Uuid>) -> NewUser {
        NewUser {
            full_name: format!("Member {}", code),
            phone: Some(format!("+221{}", code)),
            referral_code: code.to_string(),
            sponsor_id: sponsor,
            seller_recruiter_id: None,
        }
    }

    #[tokio::test]
    async fn test_uncommitted_work_is_discarded() {
        let store = MemoryStore::new();

        let mut uow = store.begin().await.unwrap();
        uow.insert_user(&new_user("A1", None)).await.unwrap();
        drop(uow);

        assert!(store.snapshot().await.users.is_empty());

        let mut uow = store.begin().await.unwrap();
        uow.insert_user(&new_user("A1", None)).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(store.snapshot().await.users.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_referral_code_rejected() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        uow.insert_user(&new_user("DUP", None)).await.unwrap();

        let mut second = new_user("DUP", None);
        second.phone = Some("+221000".to_string());
        let err = uow.insert_user(&second).await.unwrap_err();
        assert!(matches!(err, DbError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_pending_rows_filtered_by_unlock_time() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let user = uow.insert_user(&new_user("W1", None)).await.unwrap();
        let wallet = uow.insert_wallet(user.id).await.unwrap();

        let now = Utc::now();
        for hours in [1, 100] {
            uow.insert_transaction(&NewWalletTransaction {
                wallet_id: wallet.id,
                direction: TransactionDirection::Credit,
                amount: dec!(10),
                category: TransactionCategory::Cashback,
                description: "test".to_string(),
                status: TransactionStatus::Pending,
                unlock_at: now + chrono::Duration::hours(hours),
                order_id: None,
            })
            .await
            .unwrap();
        }

        let due = uow
            .lock_pending_transactions(Some(now + chrono::Duration::hours(2)), 10)
            .await
            .unwrap();
        assert_eq!(due.len(), 1);

        let all = uow.lock_pending_transactions(None, 10).await.unwrap();
        assert_eq!(all.len(), 2);

        assert!(uow.mark_transaction_validated(all[0].id, now).await.unwrap());
        assert!(!uow.mark_transaction_validated(all[0].id, now).await.unwrap());
    }

    #[tokio::test]
    async fn test_injected_commit_failure() {
        let store = MemoryStore::new();
        store.fail_next_commit();

        let mut uow = store.begin().await.unwrap();
        uow.insert_user(&new_user("C1", None)).await.unwrap();
        assert!(uow.commit().await.is_err());
        assert!(store.snapshot().await.users.is_empty());
    }
}
