//! Lossless decimal numeric type backed by rust_decimal.
//!
//! On-chain token balances are fixed-point integers scaled by a token's
//! declared decimal count, so quantity and reserve bookkeeping must stay in
//! fixed-point form end to end. Floats are allowed in exactly one place: the
//! dollar-denominated inputs a strategy hands us, which cross into `Decimal`
//! once and never come back out.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal as RustDecimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lossless decimal numeric type for quantity and reserve accounting.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(RustDecimal);

/// Raised when a float cannot cross into fixed-point bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum DecimalConversionError {
    #[error("value {0} cannot be represented as a decimal")]
    Unrepresentable(f64),
}

impl Decimal {
    pub fn new(value: RustDecimal) -> Self {
        Decimal(value)
    }

    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s).map(Decimal)
    }

    /// Convert a float into fixed-point form.
    ///
    /// This is the single sanctioned boundary crossing for dollar inputs;
    /// NaN and infinities are rejected.
    pub fn from_f64(value: f64) -> Result<Self, DecimalConversionError> {
        RustDecimal::from_f64(value)
            .map(Decimal)
            .ok_or(DecimalConversionError::Unrepresentable(value))
    }

    /// Approximate the value as a float, for valuation output only.
    pub fn to_f64(&self) -> f64 {
        // Infallible for rust_decimal's range.
        self.0.to_f64().unwrap_or(0.0)
    }

    /// Format without exponent notation and without trailing zeros.
    pub fn to_canonical_string(&self) -> String {
        format!("{}", self.0.normalize())
    }

    /// Truncate towards zero to a token's declared decimal count.
    ///
    /// Truncation, not rounding: a quantity must never exceed what the chain
    /// can actually hold.
    pub fn quantize(&self, decimals: u8) -> Self {
        Decimal(
            self.0
                .round_dp_with_strategy(decimals as u32, RoundingStrategy::ToZero),
        )
    }

    pub fn inner(&self) -> RustDecimal {
        self.0
    }

    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Returns true if the value is < 0.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    pub fn abs(&self) -> Self {
        Decimal(self.0.abs())
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 * rhs.0)
    }
}

impl std::ops::Div for Decimal {
    type Output = Decimal;

    fn div(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 / rhs.0)
    }
}

impl std::ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        Decimal(-self.0)
    }
}

impl std::ops::AddAssign for Decimal {
    fn add_assign(&mut self, rhs: Decimal) {
        self.0 += rhs.0;
    }
}

impl std::iter::Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Decimal {
        Decimal(iter.map(|d| d.0).sum())
    }
}

/// A dollar-denominated input, accepted as either a double or a fixed-point
/// decimal.
///
/// Strategy code usually deals in floats; accounting code must not. This type
/// carries the input to the boundary where `into_decimal` converts it exactly
/// once.
#[derive(Debug, Clone, Copy)]
pub enum UsDollarAmount {
    Float(f64),
    Fixed(Decimal),
}

impl UsDollarAmount {
    pub fn into_decimal(self) -> Result<Decimal, DecimalConversionError> {
        match self {
            UsDollarAmount::Float(v) => Decimal::from_f64(v),
            UsDollarAmount::Fixed(d) => Ok(d),
        }
    }
}

impl From<f64> for UsDollarAmount {
    fn from(value: f64) -> Self {
        UsDollarAmount::Float(value)
    }
}

impl From<Decimal> for UsDollarAmount {
    fn from(value: Decimal) -> Self {
        UsDollarAmount::Fixed(value)
    }
}

impl From<RustDecimal> for UsDollarAmount {
    fn from(value: RustDecimal) -> Self {
        UsDollarAmount::Fixed(Decimal(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_roundtrip() {
        for s in ["123.456", "0.0001", "1000000", "-123.456", "0"] {
            let decimal = Decimal::from_str_canonical(s).expect("parse failed");
            let reparsed =
                Decimal::from_str_canonical(&decimal.to_canonical_string()).expect("reparse");
            assert_eq!(decimal, reparsed, "roundtrip failed for {}", s);
        }
    }

    #[test]
    fn test_from_f64_rejects_nan() {
        assert!(Decimal::from_f64(f64::NAN).is_err());
        assert!(Decimal::from_f64(9500.0).is_ok());
    }

    #[test]
    fn test_quantize_truncates_towards_zero() {
        let q = Decimal::from(dec!(5.571455381439429643));
        assert_eq!(q.quantize(6), Decimal::from(dec!(5.571455)));

        let negative = Decimal::from(dec!(-5.5714559));
        assert_eq!(negative.quantize(6), Decimal::from(dec!(-5.571455)));
    }

    #[test]
    fn test_signed_predicates() {
        assert!(Decimal::from(dec!(1)).is_positive());
        assert!(Decimal::from(dec!(-1)).is_negative());
        assert!(Decimal::zero().is_zero());
        assert!(!Decimal::zero().is_positive());
        assert!(!Decimal::zero().is_negative());
    }

    #[test]
    fn test_arithmetic() {
        let a = Decimal::from(dec!(10.5));
        let b = Decimal::from(dec!(2.5));
        assert_eq!((a + b).to_canonical_string(), "13");
        assert_eq!((a - b).to_canonical_string(), "8");
        assert_eq!((a * b).to_canonical_string(), "26.25");
        assert_eq!((a / b).to_canonical_string(), "4.2");
        assert_eq!((-a).to_canonical_string(), "-10.5");
    }

    #[test]
    fn test_sum() {
        let total: Decimal = [dec!(1.5), dec!(2.5), dec!(-1)]
            .into_iter()
            .map(Decimal::from)
            .sum();
        assert_eq!(total, Decimal::from(dec!(3)));
    }

    #[test]
    fn test_serde_preserves_precision() {
        let q = Decimal::from(dec!(5.540601290520797790));
        let json = serde_json::to_string(&q).unwrap();
        let back: Decimal = serde_json::from_str(&json).unwrap();
        assert_eq!(q, back);
    }

    #[test]
    fn test_dollar_amount_from_either_form() {
        let from_float: UsDollarAmount = 9500.0.into();
        let from_fixed: UsDollarAmount = Decimal::from(dec!(9500)).into();
        assert_eq!(
            from_float.into_decimal().unwrap(),
            from_fixed.into_decimal().unwrap()
        );
    }
}
