//! Rupee amounts using decimal arithmetic.
//!
//! Prices and order totals are stored as `numeric` columns in the backend and
//! arrive as JSON numbers or strings. [`Money`] accepts both and renders with
//! Indian digit grouping (`₹1,23,456.50`).

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Mul};
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing [`Money`] from user input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The input is not a decimal number.
    #[error("'{0}' is not a valid amount")]
    Invalid(String),
    /// The amount is below zero.
    #[error("amount cannot be negative")]
    Negative,
    /// The amount is above [`Money::MAX_INPUT`].
    #[error("amount cannot exceed ₹{0}")]
    TooLarge(Decimal),
}

/// An amount in Indian rupees.
///
/// Arithmetic saturates at the decimal range so rows read from the backend
/// can never panic a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero rupees.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Currency symbol used for display.
    pub const SYMBOL: &'static str = "₹";

    /// Largest amount accepted from a form or CSV cell (one lakh crore).
    pub const MAX_INPUT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

    /// Wrap a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Build from whole rupees.
    #[must_use]
    pub fn from_rupees(rupees: i64) -> Self {
        Self(Decimal::from(rupees))
    }

    /// Underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Amount as `f64`, for chart geometry only.
    #[must_use]
    pub fn to_f64_lossy(&self) -> f64 {
        use rust_decimal::prelude::ToPrimitive;
        self.0.to_f64().unwrap_or(0.0)
    }

    /// Parse a non-negative amount typed into a form or CSV cell.
    ///
    /// A leading `₹` and thousands separators are tolerated.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Invalid`] for non-numeric input and
    /// [`MoneyError::Negative`] for amounts below zero and
    /// [`MoneyError::TooLarge`] above [`Self::MAX_INPUT`].
    pub fn parse_input(input: &str) -> Result<Self, MoneyError> {
        let cleaned: String = input
            .trim()
            .trim_start_matches(Self::SYMBOL)
            .chars()
            .filter(|c| *c != ',' && !c.is_whitespace())
            .collect();
        let amount =
            Decimal::from_str(&cleaned).map_err(|_| MoneyError::Invalid(input.trim().to_owned()))?;
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative);
        }
        if amount > Self::MAX_INPUT {
            return Err(MoneyError::TooLarge(Self::MAX_INPUT));
        }
        Ok(Self(amount))
    }

    /// Plain two-decimal representation without symbol or grouping (`1234.50`).
    ///
    /// Used for CSV cells and form values.
    #[must_use]
    pub fn plain(&self) -> String {
        format!("{:.2}", self.0.round_dp(2))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.0.round_dp(2);
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        let text = format!("{:.2}", rounded.abs());
        let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));
        write!(f, "{sign}{}{}.{fraction}", Self::SYMBOL, group_indian(whole))
    }
}

/// Insert separators the Indian way: last three digits, then pairs.
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_owned();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(head.get(start..end).unwrap_or_default());
        end = start;
    }
    groups.reverse();
    format!("{},{tail}", groups.join(","))
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    fn mul(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity)))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_small_amount() {
        assert_eq!(Money::from_rupees(50).to_string(), "₹50.00");
        assert_eq!(Money::from_rupees(999).to_string(), "₹999.00");
    }

    #[test]
    fn test_display_indian_grouping() {
        assert_eq!(Money::from_rupees(1_234).to_string(), "₹1,234.00");
        assert_eq!(Money::from_rupees(123_456).to_string(), "₹1,23,456.00");
        assert_eq!(Money::from_rupees(12_345_678).to_string(), "₹1,23,45,678.00");
    }

    #[test]
    fn test_display_rounds_to_paise() {
        let money = Money::new(Decimal::new(12_345, 3));
        assert_eq!(money.to_string(), "₹12.35");
    }

    #[test]
    fn test_sum_and_multiply() {
        let total: Money = [100, 200, 50].into_iter().map(Money::from_rupees).sum();
        assert_eq!(total, Money::from_rupees(350));
        assert_eq!(Money::from_rupees(120) * 3, Money::from_rupees(360));
    }

    #[test]
    fn test_deserialize_number_and_string() {
        let from_number: Money = serde_json::from_str("199.5").unwrap();
        let from_string: Money = serde_json::from_str("\"199.50\"").unwrap();
        assert_eq!(from_number, from_string);
    }

    #[test]
    fn test_parse_input() {
        assert_eq!(
            Money::parse_input("₹1,250.00").unwrap(),
            Money::from_rupees(1_250)
        );
        assert_eq!(Money::parse_input(" 40 ").unwrap(), Money::from_rupees(40));
        assert!(matches!(
            Money::parse_input("abc"),
            Err(MoneyError::Invalid(_))
        ));
        assert_eq!(Money::parse_input("-5"), Err(MoneyError::Negative));
    }

    #[test]
    fn test_parse_input_caps_amount() {
        assert_eq!(
            Money::parse_input("1000000000000").unwrap(),
            Money::new(Money::MAX_INPUT)
        );
        assert_eq!(
            Money::parse_input("1000000000000.01"),
            Err(MoneyError::TooLarge(Money::MAX_INPUT))
        );
        assert!(matches!(
            Money::parse_input("79228162514264337593543950335"),
            Err(MoneyError::TooLarge(_))
        ));
    }

    #[test]
    fn test_arithmetic_saturates() {
        let huge = Money::new(Decimal::MAX);
        assert_eq!(huge * 2, huge);
        assert_eq!(huge + Money::from_rupees(1), huge);
        let mut total = huge;
        total += huge;
        assert_eq!(total, huge);
        let sum: Money = [huge, huge, Money::from_rupees(5)].into_iter().sum();
        assert_eq!(sum, huge);
    }

    #[test]
    fn test_plain() {
        assert_eq!(Money::new(Decimal::new(12_345, 2)).plain(), "123.45");
    }
}
