//! Ledger configuration

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use mlmart_types::{is_storable, COMMISSION_HOLD_HOURS};

use crate::{LedgerError, LedgerResult};

/// Longest commission hold accepted from configuration (ten years)
pub const MAX_HOLD_HOURS: u32 = 24 * 365 * 10;

/// Commission rates applied to each order line value
///
/// | Recipient          | Rate |
/// |--------------------|------|
/// | buyer              | 1.0% |
/// | level-1 upline     | 1.5% |
/// | level-2 upline     | 1.0% |
/// | level-3 upline     | 0.5% |
/// | seller's recruiter | 1.0% |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRates {
    #[serde(default = "default_cashback_rate")]
    pub cashback: Decimal,

    /// Upline rates, index 0 is the direct sponsor
    #[serde(default = "default_upline_rates")]
    pub upline: [Decimal; 3],

    #[serde(default = "default_seller_referral_rate")]
    pub seller_referral: Decimal,
}

impl CommissionRates {
    /// Rate for a 1-based upline level, `None` past the last level
    pub fn upline_rate(&self, level: usize) -> Option<Decimal> {
        level.checked_sub(1).and_then(|i| self.upline.get(i)).copied()
    }
}

impl Default for CommissionRates {
    fn default() -> Self {
        Self {
            cashback: default_cashback_rate(),
            upline: default_upline_rates(),
            seller_referral: default_seller_referral_rate(),
        }
    }
}

/// Commission engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Hold applied to every commission credit
    #[serde(default = "default_hold_hours")]
    pub hold_hours: u32,

    /// Interval of the automatic settlement sweep
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Pending transactions settled per unit of work
    #[serde(default = "default_sweep_batch_size")]
    pub sweep_batch_size: u32,

    /// Run the automatic settlement sweep
    #[serde(default = "default_true")]
    pub auto_sweep: bool,

    /// Flat shipping fee charged at checkout
    #[serde(default = "default_shipping_fee")]
    pub shipping_fee: Decimal,

    #[serde(default)]
    pub rates: CommissionRates,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            hold_hours: default_hold_hours(),
            sweep_interval_secs: default_sweep_interval_secs(),
            sweep_batch_size: default_sweep_batch_size(),
            auto_sweep: true,
            shipping_fee: default_shipping_fee(),
            rates: CommissionRates::default(),
        }
    }
}

impl LedgerConfig {
    /// Reject settings the ledger cannot apply.
    pub fn validate(&self) -> LedgerResult<()> {
        if self.hold_hours > MAX_HOLD_HOURS {
            return Err(LedgerError::InvalidInput(format!(
                "hold_hours must be at most {}, got {}",
                MAX_HOLD_HOURS, self.hold_hours
            )));
        }
        if self.shipping_fee < Decimal::ZERO || !is_storable(self.shipping_fee) {
            return Err(LedgerError::InvalidInput(format!(
                "shipping_fee {} is not a storable non-negative amount",
                self.shipping_fee
            )));
        }
        let rates = &self.rates;
        let all_rates = [rates.cashback, rates.seller_referral]
            .into_iter()
            .chain(rates.upline);
        for rate in all_rates {
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                return Err(LedgerError::InvalidInput(format!(
                    "commission rate {} must be between 0 and 1",
                    rate
                )));
            }
        }
        Ok(())
    }
}

fn default_cashback_rate() -> Decimal {
    dec!(0.01)
}

fn default_upline_rates() -> [Decimal; 3] {
    [dec!(0.015), dec!(0.01), dec!(0.005)]
}

fn default_seller_referral_rate() -> Decimal {
    dec!(0.01)
}

fn default_hold_hours() -> u32 {
    COMMISSION_HOLD_HOURS
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_sweep_batch_size() -> u32 {
    500
}

fn default_shipping_fee() -> Decimal {
    dec!(2000)
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.hold_hours, 72);
        assert_eq!(config.sweep_interval_secs, 60);
        assert_eq!(config.shipping_fee, dec!(2000));
        assert!(config.auto_sweep);
    }

    #[test]
    fn test_validate() {
        assert!(LedgerConfig::default().validate().is_ok());

        let config = LedgerConfig {
            hold_hours: MAX_HOLD_HOURS,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = LedgerConfig {
            hold_hours: u32::MAX,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(LedgerError::InvalidInput(_))));

        let config = LedgerConfig {
            shipping_fee: dec!(19.999),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let mut config = LedgerConfig::default();
        config.rates.upline[2] = dec!(-0.01);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_upline_rate_levels() {
        let rates = CommissionRates::default();
        assert_eq!(rates.upline_rate(1), Some(dec!(0.015)));
        assert_eq!(rates.upline_rate(3), Some(dec!(0.005)));
        assert_eq!(rates.upline_rate(0), None);
        assert_eq!(rates.upline_rate(4), None);
    }
}
