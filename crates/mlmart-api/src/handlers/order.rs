//! Order Handlers
//!
//! Checkout, shipping payment, warehouse check-in, cancellation and the
//! delivery confirmation that triggers commission distribution.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use mlmart_db::LedgerStore;

use crate::dto::{CreateOrderRequest, DeliveryResponse, OrderItemResponse, OrderResponse};
use crate::error::ApiResult;
use crate::extractors::ValidatedJson;
use crate::state::AppState;

pub async fn create_order<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    ValidatedJson(request): ValidatedJson<CreateOrderRequest>,
) -> ApiResult<(StatusCode, Json<OrderResponse>)> {
    request.validate_all()?;
    let placed = state.engine.place_order(&request.into()).await?;
    Ok((StatusCode::CREATED, Json(placed.into())))
}

pub async fn pay_shipping<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<OrderResponse>> {
    let order = state.engine.pay_shipping(order_id).await?;
    Ok(Json(order.into()))
}

pub async fn cancel_order<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<OrderResponse>> {
    let order = state.engine.cancel_order(order_id).await?;
    Ok(Json(order.into()))
}

/// Confirm delivery. A repeated confirmation answers `already_completed`.
pub async fn confirm_delivery<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<DeliveryResponse>> {
    let outcome = state.engine.on_delivery_confirmed(order_id).await?;
    Ok(Json(outcome.into()))
}

pub async fn check_in_item<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(item_id): Path<Uuid>,
) -> ApiResult<Json<OrderItemResponse>> {
    let item = state.engine.check_in_item(item_id).await?;
    Ok(Json(item.into()))
}

/// Items a seller still has to drop at the warehouse
pub async fn pending_dropoffs<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(seller_id): Path<Uuid>,
) -> ApiResult<Json<Vec<OrderItemResponse>>> {
    let items = state.engine.pending_dropoffs(seller_id).await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}
