//! Decimal money amounts.
//!
//! Prices are stored as `NUMERIC(12, 2)` and carried as [`Decimal`] end to
//! end; floating point never touches an amount.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Round an amount to whole cents, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// An amount together with its currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (crowns, not hellers).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency: CurrencyCode) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", round_money(self.amount), self.currency.code())
    }
}

/// ISO 4217 currency codes accepted by the shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    CZK,
    EUR,
    USD,
}

impl CurrencyCode {
    /// Three-letter ISO code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::CZK => "CZK",
            Self::EUR => "EUR",
            Self::USD => "USD",
        }
    }

    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::CZK => "Kč",
            Self::EUR => "€",
            Self::USD => "$",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CZK" => Ok(Self::CZK),
            "EUR" => Ok(Self::EUR),
            "USD" => Ok(Self::USD),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(round_money(Decimal::new(12_345, 3)), Decimal::new(1235, 2));
        assert_eq!(round_money(Decimal::new(-12_345, 3)), Decimal::new(-1235, 2));
        assert_eq!(round_money(Decimal::new(1_234, 3)), Decimal::new(123, 2));
    }

    #[test]
    fn test_money_display() {
        let money = Money::new(Decimal::new(129_900, 2), CurrencyCode::CZK);
        assert_eq!(money.to_string(), "1299.00 CZK");
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("czk".parse::<CurrencyCode>().unwrap(), CurrencyCode::CZK);
        assert_eq!(" EUR ".parse::<CurrencyCode>().unwrap(), CurrencyCode::EUR);
        assert!("GBP".parse::<CurrencyCode>().is_err());
    }
}
