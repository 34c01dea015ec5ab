//! Administrative Handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;

use mlmart_db::LedgerStore;

use crate::dto::{SettleRequest, SettleResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// Run the settlement sweep on demand
pub async fn settle<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(request): Json<SettleRequest>,
) -> ApiResult<Json<SettleResponse>> {
    let now = Utc::now();
    let settled = state.engine.settle_due_at(request.scope(now), now).await?;
    tracing::info!(mode = ?request.mode, settled, "Manual settlement");
    Ok(Json(SettleResponse {
        mode: request.mode,
        settled,
    }))
}
