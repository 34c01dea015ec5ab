//! Order DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use mlmart_db::{DbOrder, DbOrderItem};
use mlmart_ledger::{CheckoutLine, DeliveryOutcome, PlaceOrder, PlacedOrder};
use mlmart_types::is_storable;

use crate::dto::TransactionResponse;

/// One line of a new order
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderLineRequest {
    pub variant_id: Uuid,
    pub seller_id: Uuid,
    #[validate(range(min = 1, max = 10000, message = "Quantity must be 1-10000"))]
    pub quantity: i32,
    #[validate(custom(function = "validate_unit_price"))]
    pub unit_price: Decimal,
}

fn validate_unit_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price > Decimal::ZERO && is_storable(*price) {
        return Ok(());
    }
    let mut err = ValidationError::new("unit_price");
    err.message = Some("Unit price must be positive with at most 2 decimal places".into());
    Err(err)
}

/// Checkout request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub buyer_id: Uuid,
    #[validate(length(min = 1, max = 100, message = "Order must have 1-100 items"))]
    pub items: Vec<OrderLineRequest>,
    #[validate(length(max = 32))]
    #[serde(default)]
    pub payment_method: Option<String>,
}

impl CreateOrderRequest {
    /// Validate the request and each of its lines
    pub fn validate_all(&self) -> Result<(), validator::ValidationErrors> {
        self.validate()?;
        for item in &self.items {
            item.validate()?;
        }
        Ok(())
    }
}

impl From<CreateOrderRequest> for PlaceOrder {
    fn from(req: CreateOrderRequest) -> Self {
        Self {
            buyer_id: req.buyer_id,
            lines: req
                .items
                .into_iter()
                .map(|l| CheckoutLine {
                    variant_id: l.variant_id,
                    seller_id: l.seller_id,
                    quantity: l.quantity,
                    unit_price: l.unit_price,
                })
                .collect(),
            payment_method: req.payment_method,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemResponse {
    pub item_id: Uuid,
    pub order_id: Uuid,
    pub variant_id: Uuid,
    pub seller_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub status: String,
}

impl From<DbOrderItem> for OrderItemResponse {
    fn from(item: DbOrderItem) -> Self {
        Self {
            item_id: item.id,
            order_id: item.order_id,
            variant_id: item.variant_id,
            seller_id: item.seller_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            status: item.item_status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order_id: Uuid,
    pub buyer_id: Uuid,
    pub status: String,
    pub shipping_payment_status: String,
    pub total_products_amount: Decimal,
    pub shipping_fee: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commissions_distributed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<OrderItemResponse>,
}

impl From<DbOrder> for OrderResponse {
    fn from(order: DbOrder) -> Self {
        Self {
            order_id: order.id,
            buyer_id: order.buyer_id,
            status: order.global_status,
            shipping_payment_status: order.shipping_payment_status,
            total_products_amount: order.total_products_amount,
            shipping_fee: order.shipping_fee,
            payment_method: order.payment_method,
            commissions_distributed_at: order.commissions_distributed_at,
            created_at: order.created_at,
            items: Vec::new(),
        }
    }
}

impl From<PlacedOrder> for OrderResponse {
    fn from(placed: PlacedOrder) -> Self {
        let mut response = Self::from(placed.order);
        response.items = placed.items.into_iter().map(Into::into).collect();
        response
    }
}

/// Result of a delivery confirmation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryResponse {
    pub order_id: Uuid,
    /// `distributed` or `already_completed`
    pub outcome: String,
    pub credits: Vec<TransactionResponse>,
    pub skipped: usize,
}

impl From<DeliveryOutcome> for DeliveryResponse {
    fn from(outcome: DeliveryOutcome) -> Self {
        match outcome {
            DeliveryOutcome::Distributed(receipt) => Self {
                order_id: receipt.order_id,
                outcome: "distributed".to_string(),
                credits: receipt.credits.into_iter().map(Into::into).collect(),
                skipped: receipt.skipped,
            },
            DeliveryOutcome::AlreadyCompleted { order_id, credits } => Self {
                order_id,
                outcome: "already_completed".to_string(),
                credits: credits.into_iter().map(Into::into).collect(),
                skipped: 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(unit_price: Decimal) -> OrderLineRequest {
        OrderLineRequest {
            variant_id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            quantity: 2,
            unit_price,
        }
    }

    #[test]
    fn test_unit_price_bounds() {
        assert!(line(dec!(10.50)).validate().is_ok());
        assert!(line(Decimal::ZERO).validate().is_err());
        assert!(line(dec!(10.005)).validate().is_err());
        assert!(line(Decimal::MAX).validate().is_err());
    }

    #[test]
    fn test_validate_all_checks_lines() {
        let request = CreateOrderRequest {
            buyer_id: Uuid::new_v4(),
            items: vec![line(dec!(5)), line(Decimal::MAX)],
            payment_method: None,
        };
        assert!(request.validate().is_ok());
        assert!(request.validate_all().is_err());
    }
}
