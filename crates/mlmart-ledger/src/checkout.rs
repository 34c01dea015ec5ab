//! Checkout
//!
//! Creates an order with its items. Unit prices are copied into the items so
//! later catalog changes never affect commissions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use mlmart_db::{DbOrder, DbOrderItem, NewOrder, NewOrderItem, UnitOfWork};
use mlmart_types::{checked_line_value, is_storable, MAX_AMOUNT, MINOR_UNIT_SCALE};

use crate::{LedgerError, LedgerResult};

/// One cart line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutLine {
    pub variant_id: Uuid,
    pub seller_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Checkout request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub buyer_id: Uuid,
    pub lines: Vec<CheckoutLine>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

/// A created order with its items
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order: DbOrder,
    pub items: Vec<DbOrderItem>,
}

/// Create an order in the caller's unit of work.
pub async fn place_order<U: UnitOfWork>(
    uow: &mut U,
    request: &PlaceOrder,
    shipping_fee: Decimal,
) -> LedgerResult<PlacedOrder> {
    if request.lines.is_empty() {
        return Err(LedgerError::InvalidInput("order has no lines".to_string()));
    }
    for line in &request.lines {
        if line.quantity < 1 {
            return Err(LedgerError::InvalidInput(format!(
                "quantity must be at least 1, got {}",
                line.quantity
            )));
        }
        if line.unit_price <= Decimal::ZERO {
            return Err(LedgerError::InvalidInput(format!(
                "unit price must be positive, got {}",
                line.unit_price
            )));
        }
        if !is_storable(line.unit_price) {
            return Err(LedgerError::InvalidInput(format!(
                "unit price {} must have at most {} decimal places and not exceed {}",
                line.unit_price, MINOR_UNIT_SCALE, MAX_AMOUNT
            )));
        }
    }

    let total = products_total(&request.lines)?;

    if uow.find_user(request.buyer_id).await?.is_none() {
        return Err(LedgerError::UserNotFound(request.buyer_id));
    }
    for line in &request.lines {
        if uow.find_user(line.seller_id).await?.is_none() {
            return Err(LedgerError::UserNotFound(line.seller_id));
        }
    }

    let order = uow
        .insert_order(&NewOrder {
            buyer_id: request.buyer_id,
            total_products_amount: total,
            shipping_fee,
            payment_method: request.payment_method.clone(),
        })
        .await?;

    let mut items = Vec::with_capacity(request.lines.len());
    for line in &request.lines {
        items.push(
            uow.insert_order_item(&NewOrderItem {
                order_id: order.id,
                variant_id: line.variant_id,
                seller_id: line.seller_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
            })
            .await?,
        );
    }

    info!(
        order_id = %order.id,
        buyer_id = %order.buyer_id,
        items = items.len(),
        total = %total,
        "Order placed"
    );

    Ok(PlacedOrder { order, items })
}

/// Sum of line values, bounded by what an order row can store
fn products_total(lines: &[CheckoutLine]) -> LedgerResult<Decimal> {
    let too_large = || LedgerError::InvalidInput(format!("order total exceeds {}", MAX_AMOUNT));

    let mut total = Decimal::ZERO;
    for line in lines {
        let value = checked_line_value(line.unit_price, line.quantity).ok_or_else(too_large)?;
        total = total.checked_add(value).ok_or_else(too_large)?;
    }
    if total > MAX_AMOUNT {
        return Err(too_large());
    }
    Ok(total)
}
