//! Member DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use mlmart_ledger::{RegisterMember, RegisteredMember};

/// Registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub full_name: String,
    #[validate(length(min = 4, max = 32, message = "Phone must be 4-32 characters"))]
    #[serde(default)]
    pub phone: Option<String>,
    /// Referral code of the sponsor
    #[validate(length(max = 32))]
    #[serde(default)]
    pub sponsor_code: Option<String>,
    /// Referral code of the seller recruiter
    #[validate(length(max = 32))]
    #[serde(default)]
    pub recruiter_code: Option<String>,
}

impl From<RegisterRequest> for RegisterMember {
    fn from(req: RegisterRequest) -> Self {
        Self {
            full_name: req.full_name,
            phone: req.phone,
            sponsor_code: req.sponsor_code,
            recruiter_code: req.recruiter_code,
        }
    }
}

/// Registered member with its wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberResponse {
    pub user_id: Uuid,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub referral_code: String,
    pub sponsor_id: Option<Uuid>,
    pub seller_recruiter_id: Option<Uuid>,
    pub wallet_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<RegisteredMember> for MemberResponse {
    fn from(member: RegisteredMember) -> Self {
        let RegisteredMember { user, wallet } = member;
        Self {
            user_id: user.id,
            full_name: user.full_name,
            phone: user.phone,
            referral_code: user.referral_code,
            sponsor_id: user.sponsor_id,
            seller_recruiter_id: user.seller_recruiter_id,
            wallet_id: wallet.id,
            created_at: user.created_at,
        }
    }
}
