//! Customer details, order snapshots, and delivery estimates.

use core::fmt;

use chrono::{NaiveDateTime, TimeDelta};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::{CartLine, OrderTotals};
use crate::types::{OrderId, PhoneError, PhoneNumber, ProductId};

/// Errors raised when validating customer details.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CustomerError {
    #[error("customer name is required")]
    MissingName,
    #[error("delivery address is required")]
    MissingAddress,
    #[error(transparent)]
    Phone(#[from] PhoneError),
}

/// Who the order is for and where it goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub phone: PhoneNumber,
    /// Formatted delivery address.
    pub address: String,
    /// Free-text notes for the driver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl CustomerInfo {
    /// Validate and trim raw form input.
    ///
    /// # Errors
    ///
    /// Returns `CustomerError` if the name or address is blank or the phone
    /// number is invalid.
    pub fn new(
        name: &str,
        phone: &str,
        address: &str,
        instructions: Option<&str>,
    ) -> Result<Self, CustomerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CustomerError::MissingName);
        }
        let address = address.trim();
        if address.is_empty() {
            return Err(CustomerError::MissingAddress);
        }
        let phone = PhoneNumber::parse(phone)?;
        let instructions = instructions
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self {
            name: name.to_string(),
            phone,
            address: address.to_string(),
            instructions,
        })
    }
}

/// Advertised delivery time range, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryWindow {
    pub min_minutes: u32,
    pub max_minutes: u32,
}

impl DeliveryWindow {
    /// `None` unless `min_minutes <= max_minutes`.
    #[must_use]
    pub const fn new(min_minutes: u32, max_minutes: u32) -> Option<Self> {
        if min_minutes <= max_minutes {
            Some(Self {
                min_minutes,
                max_minutes,
            })
        } else {
            None
        }
    }

    /// Midpoint estimate: `placed_at + (min + max) / 2` minutes, kept to
    /// the second so odd sums do not lose their half minute.
    #[must_use]
    pub fn expected_delivery(&self, placed_at: NaiveDateTime) -> NaiveDateTime {
        let seconds = (i64::from(self.min_minutes) + i64::from(self.max_minutes)) * 60 / 2;
        placed_at + TimeDelta::seconds(seconds)
    }
}

impl fmt::Display for DeliveryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} minutes", self.min_minutes, self.max_minutes)
    }
}

/// One item of a placed order, frozen at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl OrderLine {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

impl From<&CartLine> for OrderLine {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id,
            name: line.name.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
        }
    }
}

/// Everything persisted about an order when it is committed.
///
/// The snapshot does not change after commit; only the order's status does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub customer: CustomerInfo,
    pub lines: Vec<OrderLine>,
    pub totals: OrderTotals,
    /// Processor reference, kept for reconciliation.
    pub payment_intent_id: String,
    pub placed_at: NaiveDateTime,
}

impl OrderSnapshot {
    /// Numbered item summary, one line per item:
    /// `1. Chips x2 ($9.00)`.
    #[must_use]
    pub fn item_summary(&self, symbol: &str) -> Vec<String> {
        summarize_items(&self.lines, symbol)
    }
}

/// Numbered summary of `lines`, as used in order notifications and payment
/// metadata.
#[must_use]
pub fn summarize_items(lines: &[OrderLine], symbol: &str) -> Vec<String> {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            format!(
                "{}. {} x{} ({symbol}{:.2})",
                i + 1,
                line.name,
                line.quantity,
                line.line_total()
            )
        })
        .collect()
}

/// Returned to the customer once payment is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub order_id: OrderId,
    pub expected_delivery_time: NaiveDateTime,
}
