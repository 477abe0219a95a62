//! Type-safe price representation using decimal arithmetic.
//!
//! Catalogue prices arrive from the backend as decimal strings (or plain
//! numbers) and are kept as [`Decimal`] end to end so cart totals never pick
//! up binary floating point error.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Format for display with two decimals (e.g., "$19.99", "₹499.00").
    #[must_use]
    pub fn display(&self) -> String {
        let mut amount = self
            .amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        amount.rescale(2);
        format!("{}{amount}", self.currency_code.symbol())
    }

    /// Amount in the smallest currency unit (cents, paise).
    ///
    /// Returns `None` if the amount does not fit in an `i64`.
    #[must_use]
    pub fn minor_units(&self) -> Option<i64> {
        to_minor_units(self.amount)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[allow(clippy::upper_case_acronyms)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    INR,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::INR => "₹",
        }
    }

    /// ISO 4217 code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
            Self::INR => "INR",
        }
    }
}

/// Error returned for currency codes the storefront does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported currency code: {0}")]
pub struct UnknownCurrency(pub String);

impl FromStr for CurrencyCode {
    type Err = UnknownCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            "INR" => Ok(Self::INR),
            _ => Err(UnknownCurrency(s.to_string())),
        }
    }
}

/// Format an optional catalogue price the way the storefront shows it.
///
/// Missing prices render as `$0.00`; everything else as `$` plus two
/// decimals.
///
/// ```
/// use nexgen_core::format_price;
/// use rust_decimal::Decimal;
///
/// assert_eq!(format_price(None), "$0.00");
/// assert_eq!(format_price(Some(Decimal::new(1999, 2))), "$19.99");
/// assert_eq!(format_price(Some(Decimal::new(5, 0))), "$5.00");
/// ```
#[must_use]
pub fn format_price(amount: Option<Decimal>) -> String {
    amount.map_or_else(
        || "$0.00".to_string(),
        |amount| Price::new(amount, CurrencyCode::USD).display(),
    )
}

/// Convert an amount to minor units (x100), rounding half away from zero.
///
/// Payment gateways take integer amounts: 499.5 INR is sent as 49950 paise.
#[must_use]
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_rounds_to_cents() {
        let price = Price::new(Decimal::new(12_345, 3), CurrencyCode::USD);
        assert_eq!(price.display(), "$12.35");
    }

    #[test]
    fn test_display_inr() {
        let price = Price::new(Decimal::new(499, 0), CurrencyCode::INR);
        assert_eq!(price.display(), "₹499.00");
    }

    #[test]
    fn test_format_price_missing() {
        assert_eq!(format_price(None), "$0.00");
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(to_minor_units(Decimal::new(4995, 1)), Some(49_950));
        assert_eq!(to_minor_units(Decimal::new(10_005, 4)), Some(100));
        assert_eq!(to_minor_units(Decimal::new(1_234_567, 2)), Some(1_234_567));
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("inr".parse::<CurrencyCode>().unwrap(), CurrencyCode::INR);
        assert_eq!(" USD ".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
