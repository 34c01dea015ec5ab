//! Wallet read models

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use mlmart_db::{DbWallet, DbWalletTransaction, UnitOfWork};
use mlmart_types::{TransactionStatus, WalletSummary};

use crate::{LedgerError, LedgerResult};

/// Comparison of a wallet's cached balance with its transaction log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub user_id: Uuid,
    pub wallet_id: Uuid,
    pub balance_cash: Decimal,
    /// Sum of validated transactions
    pub validated_total: Decimal,
    /// `balance_cash - validated_total`
    pub drift: Decimal,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.drift.is_zero()
    }
}

/// `{available, pending, bonus}` for a member
pub async fn wallet_summary<U: UnitOfWork>(
    uow: &mut U,
    user_id: Uuid,
) -> LedgerResult<WalletSummary> {
    let wallet = wallet_of(uow, user_id).await?;
    let pending = uow
        .sum_transactions(wallet.id, TransactionStatus::Pending)
        .await?;

    Ok(WalletSummary {
        user_id,
        available: wallet.balance_cash,
        pending,
        bonus: wallet.balance_bonus,
    })
}

/// Transaction log of a member's wallet, newest first
pub async fn wallet_history<U: UnitOfWork>(
    uow: &mut U,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> LedgerResult<Vec<DbWalletTransaction>> {
    if limit < 1 || offset < 0 {
        return Err(LedgerError::InvalidInput(
            "limit must be positive and offset non-negative".to_string(),
        ));
    }
    let wallet = wallet_of(uow, user_id).await?;
    Ok(uow.list_transactions(wallet.id, limit, offset).await?)
}

/// Recompute the validated total of a wallet and compare it with `balance_cash`.
pub async fn reconcile_wallet<U: UnitOfWork>(
    uow: &mut U,
    user_id: Uuid,
) -> LedgerResult<Reconciliation> {
    let wallet = wallet_of(uow, user_id).await?;
    let validated_total = uow
        .sum_transactions(wallet.id, TransactionStatus::Validated)
        .await?;

    Ok(Reconciliation {
        user_id,
        wallet_id: wallet.id,
        balance_cash: wallet.balance_cash,
        validated_total,
        drift: wallet.balance_cash - validated_total,
    })
}

async fn wallet_of<U: UnitOfWork>(uow: &mut U, user_id: Uuid) -> LedgerResult<DbWallet> {
    if let Some(wallet) = uow.find_wallet_by_user(user_id).await? {
        return Ok(wallet);
    }
    if uow.find_user(user_id).await?.is_none() {
        return Err(LedgerError::UserNotFound(user_id));
    }
    Err(LedgerError::WalletNotFound(user_id))
}
