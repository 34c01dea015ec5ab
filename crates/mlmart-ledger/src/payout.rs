//! Payout engine
//!
//! The single write path into wallet balances and the transaction log. A
//! credit with no hold is inserted `validated` and increments `balance_cash`
//! in the same unit of work; a held credit is inserted `pending` with an
//! `unlock_at` and leaves the balance untouched until settlement.

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use mlmart_db::{DbWalletTransaction, NewWalletTransaction, WalletRepository};
use mlmart_types::{round_minor, CreditInstruction, TransactionDirection, TransactionStatus};

use crate::{LedgerError, LedgerResult};

/// Why a credit was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Amount is zero or negative after rounding to the minor unit
    NonPositiveAmount,
    /// Recipient has no wallet
    MissingWallet,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NonPositiveAmount => "non_positive_amount",
            Self::MissingWallet => "missing_wallet",
        }
    }
}

/// Result of applying one credit instruction
#[derive(Debug, Clone)]
pub enum PayoutOutcome {
    Applied(DbWalletTransaction),
    Skipped(SkipReason),
}

impl PayoutOutcome {
    pub fn applied(&self) -> Option<&DbWalletTransaction> {
        match self {
            Self::Applied(tx) => Some(tx),
            Self::Skipped(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PayoutEngine;

impl PayoutEngine {
    pub fn new() -> Self {
        Self
    }

    /// Apply one credit inside the caller's unit of work.
    ///
    /// Invalid amounts and missing wallets are skipped with a warning and never
    /// fail the surrounding operation. Storage errors propagate.
    pub async fn apply_credit<W>(
        &self,
        repo: &mut W,
        credit: &CreditInstruction,
        order_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> LedgerResult<PayoutOutcome>
    where
        W: WalletRepository + ?Sized,
    {
        let amount = round_minor(credit.amount);
        if amount <= Decimal::ZERO {
            return Ok(self.skip(credit, SkipReason::NonPositiveAmount));
        }

        let Some(wallet) = repo.find_wallet_by_user(credit.recipient).await? else {
            return Ok(self.skip(credit, SkipReason::MissingWallet));
        };

        let status = TransactionStatus::for_hold(credit.hold_hours);
        let unlock_at = now
            .checked_add_signed(Duration::hours(i64::from(credit.hold_hours)))
            .ok_or_else(|| {
                LedgerError::InvalidInput(format!(
                    "hold of {} hours overflows the unlock time",
                    credit.hold_hours
                ))
            })?;
        let tx = repo
            .insert_transaction(&NewWalletTransaction {
                wallet_id: wallet.id,
                direction: TransactionDirection::Credit,
                amount,
                category: credit.category,
                description: credit.description.clone(),
                status,
                unlock_at,
                order_id,
            })
            .await?;

        if status == TransactionStatus::Validated {
            repo.credit_cash(wallet.id, amount).await?;
        }

        debug!(
            recipient = %credit.recipient,
            category = %credit.category,
            %amount,
            status = %status,
            "Credit applied"
        );

        Ok(PayoutOutcome::Applied(tx))
    }

    fn skip(&self, credit: &CreditInstruction, reason: SkipReason) -> PayoutOutcome {
        warn!(
            recipient = %credit.recipient,
            category = %credit.category,
            amount = %credit.amount,
            reason = reason.as_str(),
            "Skipping credit"
        );
        counter!("mlmart_payouts_skipped_total", "reason" => reason.as_str()).increment(1);
        PayoutOutcome::Skipped(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::member;
    use mlmart_db::memory::MemoryStore;
    use mlmart_db::{LedgerStore, UnitOfWork};
    use mlmart_types::TransactionCategory;
    use rust_decimal_macros::dec;

    fn instruction(recipient: Uuid, amount: Decimal, hold_hours: u32) -> CreditInstruction {
        CreditInstruction {
            recipient,
            amount,
            category: TransactionCategory::Cashback,
            description: "test credit".to_string(),
            hold_hours,
            order_item_id: None,
        }
    }

    #[tokio::test]
    async fn test_held_credit_is_pending() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let user = member(&mut uow, "P1").await;
        let now = Utc::now();

        let outcome = PayoutEngine::new()
            .apply_credit(&mut uow, &instruction(user, dec!(15), 72), None, now)
            .await
            .unwrap();
        let tx = outcome.applied().unwrap();
        assert!(tx.is_pending());
        assert_eq!(tx.unlock_at, now + Duration::hours(72));

        let wallet = uow.find_wallet_by_user(user).await.unwrap().unwrap();
        assert_eq!(wallet.balance_cash, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_unheld_credit_increments_balance() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let user = member(&mut uow, "P2").await;

        let outcome = PayoutEngine::new()
            .apply_credit(&mut uow, &instruction(user, dec!(12.345), 0), None, Utc::now())
            .await
            .unwrap();
        let tx = outcome.applied().unwrap();
        assert_eq!(tx.status, "validated");
        assert_eq!(tx.amount, dec!(12.35));
        assert!(tx.validated_at.is_some());

        let wallet = uow.find_wallet_by_user(user).await.unwrap().unwrap();
        assert_eq!(wallet.balance_cash, dec!(12.35));
        uow.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_credits_are_skipped() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let user = member(&mut uow, "P3").await;
        let engine = PayoutEngine::new();

        for amount in [Decimal::ZERO, dec!(-5), dec!(0.004)] {
            let outcome = engine
                .apply_credit(&mut uow, &instruction(user, amount, 72), None, Utc::now())
                .await
                .unwrap();
            assert!(matches!(outcome, PayoutOutcome::Skipped(SkipReason::NonPositiveAmount)));
        }

        let outcome = engine
            .apply_credit(&mut uow, &instruction(Uuid::new_v4(), dec!(5), 72), None, Utc::now())
            .await
            .unwrap();
        assert!(matches!(outcome, PayoutOutcome::Skipped(SkipReason::MissingWallet)));

        let wallet = uow.find_wallet_by_user(user).await.unwrap().unwrap();
        assert!(uow.list_transactions(wallet.id, 10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unlock_overflow_is_an_error() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let user = member(&mut uow, "P4").await;

        let err = PayoutEngine::new()
            .apply_credit(&mut uow, &instruction(user, dec!(5), u32::MAX), None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let wallet = uow.find_wallet_by_user(user).await.unwrap().unwrap();
        assert!(uow.list_transactions(wallet.id, 10, 0).await.unwrap().is_empty());
    }
}
