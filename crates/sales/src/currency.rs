//! Currency rounding capability.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use subchapters_core::ValueObject;

/// Rounds monetary amounts the way the order's currency requires.
pub trait Rounding {
    fn round(&self, amount: Decimal) -> Decimal;
}

impl<R: Rounding + ?Sized> Rounding for &R {
    fn round(&self, amount: Decimal) -> Decimal {
        (**self).round(amount)
    }
}

/// Order currency: ISO code plus number of decimal digits.
///
/// Rounding is half-to-even, like the accounting layer of the order system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    pub digits: u32,
}

impl Currency {
    pub fn new(code: impl Into<String>, digits: u32) -> Self {
        Self {
            code: code.into(),
            digits,
        }
    }

    pub fn eur() -> Self {
        Self::new("EUR", 2)
    }
}

impl ValueObject for Currency {}

impl Rounding for Currency {
    fn round(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.digits, RoundingStrategy::MidpointNearestEven)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_to_even() {
        let eur = Currency::eur();
        assert_eq!(eur.round(dec!(1.005)), dec!(1.00));
        assert_eq!(eur.round(dec!(1.015)), dec!(1.02));
        assert_eq!(eur.round(dec!(3.14159)), dec!(3.14));
    }

    #[test]
    fn zero_digit_currency() {
        let jpy = Currency::new("JPY", 0);
        assert_eq!(jpy.round(dec!(12.5)), dec!(12));
        assert_eq!(jpy.round(dec!(13.5)), dec!(14));
    }
}
