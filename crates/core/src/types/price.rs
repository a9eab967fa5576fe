//! Type-safe price representation using decimal arithmetic.
//!
//! Amounts are held as [`Decimal`] in the currency's standard unit (dollars,
//! not cents). Conversion to integer minor units only happens at the payment
//! processor boundary, via [`Price::to_minor_units`], which rounds half-up.

use core::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when converting a [`Price`] to minor units.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Payment amounts cannot be negative.
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
    /// The amount does not fit in an `i64` number of minor units.
    #[error("price is too large to charge: {0}")]
    Overflow(Decimal),
}

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

    /// Create a price from an integer number of minor units (e.g., cents).
    #[must_use]
    pub fn from_minor_units(minor: i64, currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::new(minor, 2), currency_code)
    }

    /// Convert to integer minor units, rounding half-up.
    ///
    /// `7.005` becomes `701`; `27` becomes `2700`.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` for negative amounts and
    /// `PriceError::Overflow` if the result does not fit in an `i64`.
    pub fn to_minor_units(&self) -> Result<i64, PriceError> {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(PriceError::Negative(self.amount));
        }

        self.amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .map(|cents| cents.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|cents| cents.to_i64())
            .ok_or(PriceError::Overflow(self.amount))
    }

    /// Format for display (e.g., "$27.00").
    #[must_use]
    pub fn display(&self) -> String {
        format!(
            "{}{:.2}",
            self.currency_code.symbol(),
            self.amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        )
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyCode {
    #[default]
    NZD,
    AUD,
    USD,
    CAD,
    GBP,
    EUR,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::NZD | Self::AUD | Self::USD | Self::CAD => "$",
            Self::GBP => "£",
            Self::EUR => "€",
        }
    }

    /// Lowercase ISO code, as payment processors expect it.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NZD => "nzd",
            Self::AUD => "aud",
            Self::USD => "usd",
            Self::CAD => "cad",
            Self::GBP => "gbp",
            Self::EUR => "eur",
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nzd" => Ok(Self::NZD),
            "aud" => Ok(Self::AUD),
            "usd" => Ok(Self::USD),
            "cad" => Ok(Self::CAD),
            "gbp" => Ok(Self::GBP),
            "eur" => Ok(Self::EUR),
            _ => Err(format!("unsupported currency: {s}")),
        }
    }
}
