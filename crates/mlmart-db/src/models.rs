//! Database models - mapped from PostgreSQL tables

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use mlmart_types::{
    ItemStatus, OrderStatus, ShippingPaymentStatus, TransactionCategory, TransactionDirection,
    TransactionStatus, TypesError,
};

// ============================================================================
// User Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbUser {
    pub id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
    pub referral_code: String,
    /// Referrer earning upline commissions; set once at registration
    pub sponsor_id: Option<Uuid>,
    /// Vendor-side referrer earning seller-referral commissions
    pub seller_recruiter_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub phone: Option<String>,
    pub referral_code: String,
    pub sponsor_id: Option<Uuid>,
    pub seller_recruiter_id: Option<Uuid>,
}

// ============================================================================
// Wallet Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbWallet {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Materialized sum of validated transactions
    pub balance_cash: Decimal,
    pub balance_bonus: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbWalletTransaction {
    pub id: Uuid,
    pub wallet_id: Uuid,
    #[sqlx(rename = "type")]
    pub direction: String,
    pub amount: Decimal,
    pub balance_type: String,
    pub category: String,
    pub description: String,
    pub status: String,
    pub unlock_at: DateTime<Utc>,
    pub order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
}

impl DbWalletTransaction {
    pub fn direction(&self) -> Result<TransactionDirection, TypesError> {
        self.direction.parse()
    }

    pub fn category(&self) -> Result<TransactionCategory, TypesError> {
        self.category.parse()
    }

    pub fn status(&self) -> Result<TransactionStatus, TypesError> {
        self.status.parse()
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending.as_str()
    }
}

/// Insert payload for the wallet transaction log
#[derive(Debug, Clone)]
pub struct NewWalletTransaction {
    pub wallet_id: Uuid,
    pub direction: TransactionDirection,
    pub amount: Decimal,
    pub category: TransactionCategory,
    pub description: String,
    pub status: TransactionStatus,
    pub unlock_at: DateTime<Utc>,
    pub order_id: Option<Uuid>,
}

/// Only cash balances are moved by the ledger.
pub const BALANCE_TYPE_CASH: &str = "CASH";

// ============================================================================
// Order Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbOrder {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub global_status: String,
    pub shipping_payment_status: String,
    pub total_products_amount: Decimal,
    pub shipping_fee: Decimal,
    pub payment_method: Option<String>,
    pub commissions_distributed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbOrder {
    pub fn status(&self) -> Result<OrderStatus, TypesError> {
        self.global_status.parse()
    }

    pub fn shipping_status(&self) -> Result<ShippingPaymentStatus, TypesError> {
        self.shipping_payment_status.parse()
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub buyer_id: Uuid,
    pub total_products_amount: Decimal,
    pub shipping_fee: Decimal,
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbOrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub variant_id: Uuid,
    pub seller_id: Uuid,
    pub quantity: i32,
    /// Price snapshotted at checkout
    pub unit_price: Decimal,
    pub item_status: String,
    pub created_at: DateTime<Utc>,
}

impl DbOrderItem {
    pub fn status(&self) -> Result<ItemStatus, TypesError> {
        self.item_status.parse()
    }

    /// `unit_price × quantity`
    pub fn line_value(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub order_id: Uuid,
    pub variant_id: Uuid,
    pub seller_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_line_value() {
        let item = DbOrderItem {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            variant_id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            quantity: 3,
            unit_price: dec!(2500.50),
            item_status: "awaiting_payment".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(item.line_value(), dec!(7501.50));
        assert_eq!(item.status().unwrap(), ItemStatus::AwaitingPayment);
    }
}
