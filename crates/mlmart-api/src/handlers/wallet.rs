//! Wallet Handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use mlmart_db::LedgerStore;
use mlmart_ledger::Reconciliation;
use mlmart_types::WalletSummary;

use crate::dto::{HistoryQuery, TransactionResponse};
use crate::error::ApiResult;
use crate::extractors::ValidatedQuery;
use crate::state::AppState;

/// `{available, pending, bonus}` for a member
pub async fn get_summary<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<WalletSummary>> {
    Ok(Json(state.engine.get_wallet_summary(user_id).await?))
}

/// Transaction log, newest first
pub async fn get_history<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<Uuid>,
    ValidatedQuery(query): ValidatedQuery<HistoryQuery>,
) -> ApiResult<Json<Vec<TransactionResponse>>> {
    let rows = state
        .engine
        .wallet_history(user_id, query.limit, query.offset)
        .await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

pub async fn reconcile<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Reconciliation>> {
    Ok(Json(state.engine.reconcile_wallet(user_id).await?))
}
