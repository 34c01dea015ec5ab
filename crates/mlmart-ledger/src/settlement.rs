//! Settlement sweeper
//!
//! Promotes `pending` transactions to `validated` and moves their amount into
//! `balance_cash`. The status flip is conditional on the row still being
//! pending, so a transaction is settled at most once whatever triggers the
//! sweep. Each batch is one unit of work: its increments and flips commit
//! together or not at all.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info};

use mlmart_db::{DbWalletTransaction, LedgerStore, UnitOfWork};

use crate::{finish, LedgerResult};

/// Which pending transactions a sweep settles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "as_of", rename_all = "snake_case")]
pub enum SettleScope {
    /// Only transactions whose `unlock_at` is at or before the instant
    Due(DateTime<Utc>),
    /// Every pending transaction, regardless of `unlock_at`
    All,
}

impl SettleScope {
    fn due_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Due(at) => Some(*at),
            Self::All => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SettlementSweeper {
    batch_size: u32,
}

impl SettlementSweeper {
    pub fn new(batch_size: u32) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Settle every transaction in `scope`, stamping `validated_at = now`.
    ///
    /// Returns the number of transactions settled by this call.
    pub async fn settle_due<S: LedgerStore>(
        &self,
        store: &S,
        scope: SettleScope,
        now: DateTime<Utc>,
    ) -> LedgerResult<u64> {
        let mut settled = 0u64;

        loop {
            let mut uow = store.begin().await?;
            let result = self.settle_batch(&mut uow, scope, now).await;
            let (count, exhausted) = finish(uow, result).await?;
            settled += count;
            if exhausted {
                break;
            }
        }

        if settled > 0 {
            info!(settled, ?scope, "Settlement sweep complete");
            counter!("mlmart_settled_transactions_total").increment(settled);
        } else {
            debug!(?scope, "Settlement sweep found nothing to settle");
        }

        Ok(settled)
    }

    /// Settle one batch. Returns the count and whether the scope is exhausted.
    async fn settle_batch<U: UnitOfWork>(
        &self,
        uow: &mut U,
        scope: SettleScope,
        now: DateTime<Utc>,
    ) -> LedgerResult<(u64, bool)> {
        let rows = uow
            .lock_pending_transactions(scope.due_at(), i64::from(self.batch_size))
            .await?;

        let mut count = 0u64;
        for row in &rows {
            if settle_one(uow, row, now).await? {
                count += 1;
            }
        }

        Ok((count, rows.len() < self.batch_size as usize))
    }

    /// Run `settle_due(Due(now))` every `interval` until `shutdown` flips to `true`.
    ///
    /// Failed sweeps are logged and retried on the next tick.
    pub async fn run_periodic<S: LedgerStore>(
        self,
        store: Arc<S>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(interval_secs = interval.as_secs(), "Settlement sweeper started");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Utc::now();
                    let result = self.settle_due(store.as_ref(), SettleScope::Due(now), now).await;
                    if let Err(e) = result {
                        error!(error = %e, retryable = e.is_retryable(), "Settlement sweep failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Settlement sweeper stopped");
    }
}

impl Default for SettlementSweeper {
    fn default() -> Self {
        Self::new(500)
    }
}

/// Flip one row to `validated` and credit its wallet. `false` if it was no longer pending.
async fn settle_one<U: UnitOfWork>(
    uow: &mut U,
    row: &DbWalletTransaction,
    now: DateTime<Utc>,
) -> LedgerResult<bool> {
    if !uow.mark_transaction_validated(row.id, now).await? {
        return Ok(false);
    }
    uow.credit_cash(row.wallet_id, row.amount).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::member;
    use crate::PayoutEngine;
    use mlmart_db::memory::MemoryStore;
    use mlmart_db::WalletRepository;
    use mlmart_types::{CreditInstruction, TransactionCategory};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    async fn seed_pending(store: &MemoryStore, count: usize, now: DateTime<Utc>) -> Uuid {
        let mut uow = store.begin().await.unwrap();
        let user = member(&mut uow, "SW").await;
        for _ in 0..count {
            PayoutEngine::new()
                .apply_credit(
                    &mut uow,
                    &CreditInstruction {
                        recipient: user,
                        amount: dec!(10),
                        category: TransactionCategory::MlmLevel1,
                        description: "held".to_string(),
                        hold_hours: 72,
                        order_item_id: None,
                    },
                    None,
                    now,
                )
                .await
                .unwrap();
        }
        uow.commit().await.unwrap();
        user
    }

    async fn balance(store: &MemoryStore, user: Uuid) -> rust_decimal::Decimal {
        let mut uow = store.begin().await.unwrap();
        uow.find_wallet_by_user(user).await.unwrap().unwrap().balance_cash
    }

    #[tokio::test]
    async fn test_due_scope_respects_unlock_time() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let user = seed_pending(&store, 2, now).await;
        let sweeper = SettlementSweeper::default();

        let early = now + chrono::Duration::hours(71);
        assert_eq!(sweeper.settle_due(&store, SettleScope::Due(early), early).await.unwrap(), 0);
        assert_eq!(balance(&store, user).await, dec!(0));

        let late = now + chrono::Duration::hours(72);
        assert_eq!(sweeper.settle_due(&store, SettleScope::Due(late), late).await.unwrap(), 2);
        assert_eq!(balance(&store, user).await, dec!(20));
    }

    #[tokio::test]
    async fn test_settlement_is_idempotent() {
        let store = MemoryStore::new();
        let user = seed_pending(&store, 3, Utc::now()).await;
        let sweeper = SettlementSweeper::default();

        assert_eq!(sweeper.settle_due(&store, SettleScope::All, Utc::now()).await.unwrap(), 3);
        assert_eq!(sweeper.settle_due(&store, SettleScope::All, Utc::now()).await.unwrap(), 0);
        assert_eq!(balance(&store, user).await, dec!(30));
    }

    #[tokio::test]
    async fn test_batches_cover_every_row() {
        let store = MemoryStore::new();
        let user = seed_pending(&store, 7, Utc::now()).await;

        let settled = SettlementSweeper::new(3)
            .settle_due(&store, SettleScope::All, Utc::now())
            .await
            .unwrap();
        assert_eq!(settled, 7);
        assert_eq!(balance(&store, user).await, dec!(70));
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_rows_pending() {
        let store = MemoryStore::new();
        let user = seed_pending(&store, 2, Utc::now()).await;
        store.fail_next_commit();

        let result = SettlementSweeper::default()
            .settle_due(&store, SettleScope::All, Utc::now())
            .await;
        assert!(result.unwrap_err().is_retryable());
        assert_eq!(balance(&store, user).await, dec!(0));

        let settled = SettlementSweeper::default()
            .settle_due(&store, SettleScope::All, Utc::now())
            .await
            .unwrap();
        assert_eq!(settled, 2);
    }

    #[tokio::test]
    async fn test_periodic_sweeper_stops_on_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(SettlementSweeper::default().run_periodic(
            store.clone(),
            Duration::from_millis(10),
            rx,
        ));
        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
