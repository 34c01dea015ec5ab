//! Commission engine facade
//!
//! Opens one unit of work per operation, runs the corresponding component in
//! it, and commits on success. Any error rolls the whole operation back.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::counter;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use mlmart_db::{DbOrder, DbOrderItem, DbWalletTransaction, LedgerStore};
use mlmart_types::WalletSummary;

use crate::{
    checkout, finish, registration, wallet, CommissionPolicy, DeliveryOutcome, LedgerConfig,
    LedgerResult, OrderLifecycleGate, PlaceOrder, PlacedOrder, Reconciliation, RegisterMember,
    RegisteredMember, SettleScope, SettlementSweeper,
};

/// Entry point for everything the marketplace layer asks of the ledger
pub struct CommissionEngine<S: LedgerStore> {
    store: Arc<S>,
    config: LedgerConfig,
    gate: OrderLifecycleGate,
    sweeper: SettlementSweeper,
}

impl<S: LedgerStore> Clone for CommissionEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
            gate: self.gate.clone(),
            sweeper: self.sweeper,
        }
    }
}

impl<S: LedgerStore> CommissionEngine<S> {
    pub fn new(store: Arc<S>, config: LedgerConfig) -> Self {
        let policy = CommissionPolicy::new(config.rates.clone(), config.hold_hours);
        Self {
            store,
            gate: OrderLifecycleGate::new(policy),
            sweeper: SettlementSweeper::new(config.sweep_batch_size),
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // =========================================================================
    // Members and orders
    // =========================================================================

    pub async fn register_member(
        &self,
        request: &RegisterMember,
    ) -> LedgerResult<RegisteredMember> {
        let mut uow = self.store.begin().await?;
        let result = registration::register_member(&mut uow, request).await;
        finish(uow, result).await
    }

    pub async fn place_order(&self, request: &PlaceOrder) -> LedgerResult<PlacedOrder> {
        let mut uow = self.store.begin().await?;
        let result = checkout::place_order(&mut uow, request, self.config.shipping_fee).await;
        finish(uow, result).await
    }

    pub async fn pay_shipping(&self, order_id: Uuid) -> LedgerResult<DbOrder> {
        let mut uow = self.store.begin().await?;
        let result = self.gate.pay_shipping(&mut uow, order_id).await;
        finish(uow, result).await
    }

    pub async fn check_in_item(&self, item_id: Uuid) -> LedgerResult<DbOrderItem> {
        let mut uow = self.store.begin().await?;
        let result = self.gate.check_in_item(&mut uow, item_id).await;
        finish(uow, result).await
    }

    pub async fn pending_dropoffs(&self, seller_id: Uuid) -> LedgerResult<Vec<DbOrderItem>> {
        let mut uow = self.store.begin().await?;
        let result = self.gate.pending_dropoffs(&mut uow, seller_id).await;
        finish(uow, result).await
    }

    pub async fn cancel_order(&self, order_id: Uuid) -> LedgerResult<DbOrder> {
        let mut uow = self.store.begin().await?;
        let result = self.gate.cancel_order(&mut uow, order_id).await;
        finish(uow, result).await
    }

    // =========================================================================
    // Commissions
    // =========================================================================

    /// Complete a delivered order and record its commissions.
    ///
    /// Calling this again for the same order returns
    /// [`DeliveryOutcome::AlreadyCompleted`] and writes nothing. On error no
    /// state has changed and the call may be retried.
    pub async fn on_delivery_confirmed(&self, order_id: Uuid) -> LedgerResult<DeliveryOutcome> {
        self.on_delivery_confirmed_at(order_id, Utc::now()).await
    }

    pub async fn on_delivery_confirmed_at(
        &self,
        order_id: Uuid,
        now: DateTime<Utc>,
    ) -> LedgerResult<DeliveryOutcome> {
        let mut uow = self.store.begin().await?;
        let result = self.gate.confirm_delivery(&mut uow, order_id, now).await;
        let outcome = finish(uow, result).await?;

        if let DeliveryOutcome::Distributed(receipt) = &outcome {
            counter!("mlmart_deliveries_confirmed_total").increment(1);
            for credit in &receipt.credits {
                counter!("mlmart_commission_credits_total", "category" => credit.category.clone())
                    .increment(1);
            }
        }

        Ok(outcome)
    }

    /// Settle pending transactions in `scope`.
    pub async fn settle_due(&self, scope: SettleScope) -> LedgerResult<u64> {
        self.settle_due_at(scope, Utc::now()).await
    }

    pub async fn settle_due_at(&self, scope: SettleScope, now: DateTime<Utc>) -> LedgerResult<u64> {
        self.sweeper.settle_due(self.store.as_ref(), scope, now).await
    }

    /// Spawn the periodic sweep of expired holds. Stops when `shutdown` becomes `true`.
    pub fn spawn_sweeper(&self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let interval = Duration::from_secs(self.config.sweep_interval_secs.max(1));
        tokio::spawn(
            self.sweeper
                .run_periodic(self.store.clone(), interval, shutdown),
        )
    }

    // =========================================================================
    // Wallets
    // =========================================================================

    pub async fn get_wallet_summary(&self, user_id: Uuid) -> LedgerResult<WalletSummary> {
        let mut uow = self.store.begin().await?;
        let result = wallet::wallet_summary(&mut uow, user_id).await;
        finish(uow, result).await
    }

    pub async fn wallet_history(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> LedgerResult<Vec<DbWalletTransaction>> {
        let mut uow = self.store.begin().await?;
        let result = wallet::wallet_history(&mut uow, user_id, limit, offset).await;
        finish(uow, result).await
    }

    pub async fn reconcile_wallet(&self, user_id: Uuid) -> LedgerResult<Reconciliation> {
        let mut uow = self.store.begin().await?;
        let result = wallet::reconcile_wallet(&mut uow, user_id).await;
        finish(uow, result).await
    }
}
