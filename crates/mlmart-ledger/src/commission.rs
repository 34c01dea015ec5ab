//! Commission policy
//!
//! Pure mapping from an order's lines and the resolved referral links to
//! credit instructions. Every percentage is applied per line and rounded per
//! line; lines are never merged, so two orders with the same total but a
//! different item split may earn slightly different aggregate commissions.

use std::collections::HashMap;

use rust_decimal::Decimal;
use uuid::Uuid;

use mlmart_db::DbOrderItem;
use mlmart_types::{apply_rate, CreditInstruction, ReferralChain, TransactionCategory};

use crate::CommissionRates;

/// Commission-relevant view of an order item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLine {
    pub item_id: Uuid,
    pub seller_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl OrderLine {
    /// `unit_price × quantity`, saturating at `Decimal::MAX`.
    ///
    /// Checkout bounds stored prices so real lines never reach the limit.
    pub fn line_value(&self) -> Decimal {
        self.unit_price.saturating_mul(Decimal::from(self.quantity))
    }
}

impl From<&DbOrderItem> for OrderLine {
    fn from(item: &DbOrderItem) -> Self {
        Self {
            item_id: item.id,
            seller_id: item.seller_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
        }
    }
}

/// Rates plus hold period
#[derive(Debug, Clone)]
pub struct CommissionPolicy {
    rates: CommissionRates,
    hold_hours: u32,
}

impl CommissionPolicy {
    pub fn new(rates: CommissionRates, hold_hours: u32) -> Self {
        Self { rates, hold_hours }
    }

    pub fn rates(&self) -> &CommissionRates {
        &self.rates
    }

    pub fn hold_hours(&self) -> u32 {
        self.hold_hours
    }

    /// Credit instructions for one delivered order.
    ///
    /// Per line: buyer cashback, one credit per upline level present in
    /// `chain`, and a seller-referral credit when the line's seller has an
    /// entry in `seller_recruiters`. Absent recipients get nothing and their
    /// share is not redistributed.
    pub fn compute(
        &self,
        order_id: Uuid,
        buyer_id: Uuid,
        lines: &[OrderLine],
        chain: &ReferralChain,
        seller_recruiters: &HashMap<Uuid, Uuid>,
    ) -> Vec<CreditInstruction> {
        let order_ref = short_ref(order_id);
        let mut credits = Vec::with_capacity(lines.len() * (2 + chain.len()));

        for line in lines {
            let value = line.line_value();

            credits.push(self.credit(
                line,
                buyer_id,
                apply_rate(value, self.rates.cashback),
                TransactionCategory::Cashback,
                format!("Cashback on order #{}", order_ref),
            ));

            for (level, sponsor) in chain.iter_levels() {
                let (Some(rate), Some(category)) = (
                    self.rates.upline_rate(level),
                    TransactionCategory::for_upline_level(level),
                ) else {
                    continue;
                };
                credits.push(self.credit(
                    line,
                    sponsor,
                    apply_rate(value, rate),
                    category,
                    format!("Level {} commission on order #{}", level, order_ref),
                ));
            }

            if let Some(recruiter) = seller_recruiters.get(&line.seller_id) {
                credits.push(self.credit(
                    line,
                    *recruiter,
                    apply_rate(value, self.rates.seller_referral),
                    TransactionCategory::SellerReferral,
                    format!("Seller referral commission on order #{}", order_ref),
                ));
            }
        }

        credits
    }

    fn credit(
        &self,
        line: &OrderLine,
        recipient: Uuid,
        amount: Decimal,
        category: TransactionCategory,
        description: String,
    ) -> CreditInstruction {
        CreditInstruction {
            recipient,
            amount,
            category,
            description,
            hold_hours: self.hold_hours,
            order_item_id: Some(line.item_id),
        }
    }
}

impl Default for CommissionPolicy {
    fn default() -> Self {
        Self::new(CommissionRates::default(), mlmart_types::COMMISSION_HOLD_HOURS)
    }
}

/// First eight hex digits of an id, for human-readable descriptions
fn short_ref(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}
