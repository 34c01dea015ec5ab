//! Wallet and wallet-transaction types
//!
//! A wallet transaction is an append-only ledger row. Only its status moves,
//! and only `pending → validated`.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TypesError;

/// Direction of a wallet transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionDirection {
    Credit,
}

impl TransactionDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "CREDIT",
        }
    }
}

impl fmt::Display for TransactionDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionDirection {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREDIT" => Ok(Self::Credit),
            other => Err(TypesError::unknown("transaction direction", other)),
        }
    }
}

/// Settlement status of a wallet transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Logged but not yet part of `balance_cash`
    Pending,
    /// Counted in `balance_cash`
    Validated,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Validated => "validated",
        }
    }

    /// Status a new row receives for the given hold period
    pub fn for_hold(hold_hours: u32) -> Self {
        if hold_hours == 0 {
            Self::Validated
        } else {
            Self::Pending
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "validated" => Ok(Self::Validated),
            other => Err(TypesError::unknown("transaction status", other)),
        }
    }
}

/// Why a credit was paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionCategory {
    #[serde(rename = "CASHBACK")]
    Cashback,
    #[serde(rename = "MLM_LVL1")]
    MlmLevel1,
    #[serde(rename = "MLM_LVL2")]
    MlmLevel2,
    #[serde(rename = "MLM_LVL3")]
    MlmLevel3,
    #[serde(rename = "SELLER_REF")]
    SellerReferral,
}

impl TransactionCategory {
    pub const ALL: [TransactionCategory; 5] = [
        Self::Cashback,
        Self::MlmLevel1,
        Self::MlmLevel2,
        Self::MlmLevel3,
        Self::SellerReferral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cashback => "CASHBACK",
            Self::MlmLevel1 => "MLM_LVL1",
            Self::MlmLevel2 => "MLM_LVL2",
            Self::MlmLevel3 => "MLM_LVL3",
            Self::SellerReferral => "SELLER_REF",
        }
    }

    /// Upline category for a 1-based referral level
    pub fn for_upline_level(level: usize) -> Option<Self> {
        match level {
            1 => Some(Self::MlmLevel1),
            2 => Some(Self::MlmLevel2),
            3 => Some(Self::MlmLevel3),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionCategory {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| TypesError::unknown("transaction category", s))
    }
}

/// Read-only projection of a member's wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSummary {
    pub user_id: Uuid,
    /// Settled, withdrawable cash (`balance_cash`)
    pub available: Decimal,
    /// Sum of `pending` transactions, not yet withdrawable
    pub pending: Decimal,
    /// Non-cash incentive balance, untouched by the commission engine
    pub bonus: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_for_hold() {
        assert_eq!(TransactionStatus::for_hold(0), TransactionStatus::Validated);
        assert_eq!(TransactionStatus::for_hold(72), TransactionStatus::Pending);
    }

    #[test]
    fn test_category_strings() {
        assert_eq!(TransactionCategory::MlmLevel2.as_str(), "MLM_LVL2");
        assert_eq!(
            "SELLER_REF".parse::<TransactionCategory>().unwrap(),
            TransactionCategory::SellerReferral
        );
        assert!("MLM_LVL4".parse::<TransactionCategory>().is_err());
    }

    #[test]
    fn test_upline_levels() {
        assert_eq!(
            TransactionCategory::for_upline_level(1),
            Some(TransactionCategory::MlmLevel1)
        );
        assert_eq!(TransactionCategory::for_upline_level(4), None);
    }

    #[test]
    fn test_category_serde_matches_stored_form() {
        let json = serde_json::to_string(&TransactionCategory::MlmLevel3).unwrap();
        assert_eq!(json, "\"MLM_LVL3\"");
    }
}
