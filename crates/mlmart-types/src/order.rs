//! Order lifecycle types
//!
//! ```text
//! pending ──pay shipping──▶ confirmed ──delivery──▶ completed
//!    │                          │
//!    └──────────cancel──────────┴──▶ cancelled
//! ```
//!
//! Delivery may also complete an order straight from `pending`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::TypesError;

/// Global status of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created at checkout, shipping not paid yet
    Pending,
    /// Shipping fee paid, items moving to the warehouse
    Confirmed,
    /// Delivered; commissions have been distributed
    Completed,
    /// Terminal, never completes
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        Self::Pending,
        Self::Confirmed,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Check if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// States from which delivery confirmation may complete the order
    pub fn completable_from() -> &'static [OrderStatus] {
        &[Self::Pending, Self::Confirmed]
    }

    /// States from which an order may be cancelled
    pub fn cancellable_from() -> &'static [OrderStatus] {
        &[Self::Pending, Self::Confirmed]
    }

    /// Whether `self → next` is a legal transition
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        match next {
            Self::Pending => false,
            Self::Confirmed => *self == Self::Pending,
            Self::Completed => Self::completable_from().contains(self),
            Self::Cancelled => Self::cancellable_from().contains(self),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| TypesError::unknown("order status", s))
    }
}

/// Payment status of the order's shipping fee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingPaymentStatus {
    Unpaid,
    Paid,
}

impl ShippingPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Paid => "paid",
        }
    }
}

impl fmt::Display for ShippingPaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShippingPaymentStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(Self::Unpaid),
            "paid" => Ok(Self::Paid),
            other => Err(TypesError::unknown("shipping payment status", other)),
        }
    }
}

/// Fulfillment status of a single order item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Order placed, shipping not paid
    AwaitingPayment,
    /// Seller must drop the item at the warehouse
    WaitingDropoff,
    /// Checked in at the warehouse hub
    ReceivedWarehouse,
    /// Handed to the buyer
    Delivered,
    Cancelled,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 5] = [
        Self::AwaitingPayment,
        Self::WaitingDropoff,
        Self::ReceivedWarehouse,
        Self::Delivered,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingPayment => "awaiting_payment",
            Self::WaitingDropoff => "waiting_dropoff",
            Self::ReceivedWarehouse => "received_warehouse",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| TypesError::unknown("item status", s))
    }
}
