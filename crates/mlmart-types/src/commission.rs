//! Referral chains and credit instructions

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TransactionCategory;

/// Depth of the sponsorship chain that earns upline commissions.
pub const MAX_REFERRAL_DEPTH: usize = 3;

/// Default hold period applied to commission credits.
pub const COMMISSION_HOLD_HOURS: u32 = 72;

/// Buyer's upline, nearest sponsor first.
///
/// Holds at most [`MAX_REFERRAL_DEPTH`] members. A missing link ends the chain,
/// so `levels()[0]` is always the direct sponsor when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralChain {
    levels: Vec<Uuid>,
}

impl ReferralChain {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a chain, truncating anything beyond the maximum depth.
    pub fn from_levels(mut levels: Vec<Uuid>) -> Self {
        levels.truncate(MAX_REFERRAL_DEPTH);
        Self { levels }
    }

    pub fn levels(&self) -> &[Uuid] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// `(level, member)` pairs, level starting at 1
    pub fn iter_levels(&self) -> impl Iterator<Item = (usize, Uuid)> + '_ {
        self.levels.iter().enumerate().map(|(i, id)| (i + 1, *id))
    }
}

/// One credit the payout engine should apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditInstruction {
    pub recipient: Uuid,
    pub amount: Decimal,
    pub category: TransactionCategory,
    pub description: String,
    pub hold_hours: u32,
    /// Order item the credit was computed from, if any
    pub order_item_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_truncates_to_max_depth() {
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        let chain = ReferralChain::from_levels(ids.clone());
        assert_eq!(chain.len(), MAX_REFERRAL_DEPTH);
        assert_eq!(chain.levels(), &ids[..MAX_REFERRAL_DEPTH]);
    }

    #[test]
    fn test_iter_levels_is_one_based() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let chain = ReferralChain::from_levels(vec![a, b]);
        let levels: Vec<_> = chain.iter_levels().collect();
        assert_eq!(levels, vec![(1, a), (2, b)]);
    }
}
