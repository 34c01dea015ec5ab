//! Single-currency money helpers.
//!
//! Amounts are `rust_decimal::Decimal` everywhere; this module only fixes the
//! precision used when a computed amount becomes a ledger row.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places kept on ledger amounts (currency minor unit).
pub const MINOR_UNIT_SCALE: u32 = 2;

/// Largest amount a ledger column (`NUMERIC(18, 2)`) can hold.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_808_348_671, 232_830_643, 0, false, 2);

/// Check that an amount is stored exactly: at most two decimal places and
/// within [`MAX_AMOUNT`].
pub fn is_storable(amount: Decimal) -> bool {
    amount.scale() <= MINOR_UNIT_SCALE && amount.abs() <= MAX_AMOUNT
}

/// `unit_price × quantity`, `None` on overflow.
pub fn checked_line_value(unit_price: Decimal, quantity: i32) -> Option<Decimal> {
    unit_price.checked_mul(Decimal::from(quantity))
}

/// Round an amount to the currency minor unit, midpoint away from zero.
#[inline]
pub fn round_minor(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MINOR_UNIT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Apply a rate to a base value and round the result to the minor unit.
///
/// `rate` is a fraction (`0.015` for 1.5%). The product saturates instead of
/// overflowing.
#[inline]
pub fn apply_rate(base: Decimal, rate: Decimal) -> Decimal {
    round_minor(base.saturating_mul(rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_minor_midpoint() {
        assert_eq!(round_minor(dec!(1.005)), dec!(1.01));
        assert_eq!(round_minor(dec!(1.004)), dec!(1.00));
        assert_eq!(round_minor(dec!(2)), dec!(2));
    }

    #[test]
    fn test_max_amount_matches_column() {
        assert_eq!(MAX_AMOUNT, dec!(9999999999999999.99));
        assert!(is_storable(MAX_AMOUNT));
        assert!(!is_storable(MAX_AMOUNT + dec!(0.01)));
        assert!(!is_storable(dec!(10.005)));
        assert!(is_storable(dec!(10.5)));
    }

    #[test]
    fn test_checked_line_value() {
        assert_eq!(checked_line_value(dec!(10.50), 3), Some(dec!(31.50)));
        assert_eq!(checked_line_value(Decimal::MAX, 2), None);
    }

    #[test]
    fn test_apply_rate() {
        assert_eq!(apply_rate(dec!(100000), dec!(0.015)), dec!(1500));
        assert_eq!(apply_rate(dec!(333), dec!(0.005)), dec!(1.67));
    }
}
