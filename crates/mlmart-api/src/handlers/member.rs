//! Member Handlers

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use mlmart_db::LedgerStore;

use crate::dto::{MemberResponse, RegisterRequest};
use crate::error::ApiResult;
use crate::extractors::ValidatedJson;
use crate::state::AppState;

/// Register a member and create its wallet
pub async fn register<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<MemberResponse>)> {
    let member = state.engine.register_member(&request.into()).await?;
    Ok((StatusCode::CREATED, Json(member.into())))
}
