//! Shopping cart line items and order totals.
//!
//! A [`Cart`] is owned by one customer session and mutated one event at a
//! time. Lines keep insertion order. Totals are always derived from the
//! lines with [`compute_totals`] and never stored.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::ProductId;

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    /// Unit price in major currency units.
    pub unit_price: Decimal,
    /// Always at least 1. A line reaching 0 is removed.
    pub quantity: u32,
}

impl CartLine {
    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A line whose requested quantity exceeds current stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryShortfall {
    pub product_id: ProductId,
    pub name: String,
    pub requested: u32,
    pub available: u32,
}

/// Derived order amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    /// Sum of line totals.
    pub subtotal: Decimal,
    /// Amount added to reach the minimum order value (zero when met).
    pub top_up: Decimal,
    pub delivery_charge: Decimal,
    /// `subtotal + top_up + delivery_charge`.
    pub total: Decimal,
}

/// Compute the amounts charged for `lines`.
///
/// When the subtotal is below `min_order_value` the difference is charged
/// as a top-up, so the customer always pays at least the minimum plus
/// delivery.
#[must_use]
pub fn compute_totals(
    lines: &[CartLine],
    min_order_value: Decimal,
    delivery_charge: Decimal,
) -> OrderTotals {
    let subtotal: Decimal = lines.iter().map(CartLine::line_total).sum();
    let top_up = (min_order_value - subtotal).max(Decimal::ZERO);

    OrderTotals {
        subtotal,
        top_up,
        delivery_charge,
        total: subtotal + top_up + delivery_charge,
    }
}

/// A customer's shopping cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| l.product_id == product_id)
    }

    /// Add one unit of a product.
    ///
    /// Increments an existing line, otherwise appends a new line with
    /// quantity 1. Stock is not checked here.
    pub fn add_line(&mut self, product_id: ProductId, unit_price: Decimal, name: impl Into<String>) {
        if let Some(line) = self.line_mut(product_id) {
            line.quantity = line.quantity.saturating_add(1);
            return;
        }

        self.lines.push(CartLine {
            product_id,
            name: name.into(),
            unit_price,
            quantity: 1,
        });
    }

    /// Add one unit of an existing line if the result stays within
    /// `available`. Returns whether the quantity changed.
    pub fn increment_line(&mut self, product_id: ProductId, available: u32) -> bool {
        match self.line_mut(product_id) {
            Some(line) if line.quantity < available => {
                line.quantity += 1;
                true
            }
            _ => false,
        }
    }

    /// Remove a product's line. Removing an absent product is a no-op.
    pub fn remove_line(&mut self, product_id: ProductId) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    /// Replace a line's quantity; zero removes the line.
    ///
    /// Callers clamp against inventory before calling. Absent products are
    /// ignored.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            self.remove_line(product_id);
        } else if let Some(line) = self.line_mut(product_id) {
            line.quantity = quantity;
        }
    }

    /// Reconcile the cart with stock after a failed checkout.
    ///
    /// Lines are clamped to what is available; lines with nothing
    /// available are removed.
    pub fn apply_shortfalls(&mut self, shortfalls: &[InventoryShortfall]) {
        for shortfall in shortfalls {
            self.set_quantity(shortfall.product_id, shortfall.available);
        }
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Totals for the current lines.
    #[must_use]
    pub fn totals(&self, min_order_value: Decimal, delivery_charge: Decimal) -> OrderTotals {
        compute_totals(&self.lines, min_order_value, delivery_charge)
    }
}
