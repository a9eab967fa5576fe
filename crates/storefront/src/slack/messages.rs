//! Slack message builders for order notifications.

use rust_decimal::Decimal;

use nightowl_core::{OrderId, OrderSnapshot};

use super::types::{Block, ContextElement, PlainText, Text};

/// Build the new-order summary posted to the orders channel.
///
/// The message includes:
/// - Header with the order number
/// - Customer name, phone, and delivery address
/// - Numbered item list with line totals
/// - Order total, delivery charge, and grand total
/// - Special instructions (`None` when empty)
#[must_use]
pub fn build_order_message(order_id: OrderId, order: &OrderSnapshot, symbol: &str) -> Vec<Block> {
    let customer = &order.customer;
    let totals = &order.totals;
    let items = order.item_summary(symbol).join("\n");
    let goods_total: Decimal = totals.subtotal + totals.top_up;

    let mut totals_text = format!(":moneybag: Total: {symbol}{goods_total:.2}");
    if !totals.top_up.is_zero() {
        totals_text.push_str(&format!(
            " (includes {symbol}{:.2} minimum order top-up)",
            totals.top_up
        ));
    }
    totals_text.push_str(&format!(
        "\n:truck: Delivery Charge: {symbol}{:.2}\n:money_with_wings: Grand Total: {symbol}{:.2}",
        totals.delivery_charge, totals.total
    ));

    vec![
        Block::Header {
            text: PlainText::new(format!("New Order #{order_id}")),
        },
        Block::Section {
            text: Text::mrkdwn(format!(
                ":bust_in_silhouette: Customer: {}\n:phone: Phone: {}\n:round_pushpin: Address: {}",
                customer.name,
                customer.phone.as_str(),
                customer.address
            )),
        },
        Block::Divider,
        Block::Section {
            text: Text::mrkdwn(format!("*Order Details:*\n{items}")),
        },
        Block::Divider,
        Block::Section {
            text: Text::mrkdwn(totals_text),
        },
        Block::Divider,
        Block::Section {
            text: Text::mrkdwn(format!(
                ":spiral_note_pad: Special Instructions: {}",
                customer.instructions.as_deref().unwrap_or("None")
            )),
        },
        Block::Context {
            elements: vec![ContextElement::Mrkdwn {
                text: format!("Placed {}", order.placed_at.format("%a %-d %b %H:%M")),
            }],
        },
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use nightowl_core::{CustomerInfo, OrderLine, OrderTotals, ProductId};

    use super::*;

    fn order(instructions: Option<&str>, subtotal: Decimal, top_up: Decimal) -> OrderSnapshot {
        OrderSnapshot {
            customer: CustomerInfo::new("Aroha", "021 555 0199", "12 Rue Lavaud, Akaroa", instructions)
                .unwrap(),
            lines: vec![OrderLine {
                product_id: ProductId::new(3),
                name: "Chips".to_string(),
                unit_price: Decimal::new(450, 2),
                quantity: 2,
            }],
            totals: OrderTotals {
                subtotal,
                top_up,
                delivery_charge: Decimal::new(10, 0),
                total: subtotal + top_up + Decimal::new(10, 0),
            },
            payment_intent_id: "pi_1".to_string(),
            placed_at: NaiveDate::from_ymd_opt(2026, 10, 16)
                .unwrap()
                .and_hms_opt(22, 15, 0)
                .unwrap(),
        }
    }

    fn text_of(block: &Block) -> String {
        match block {
            Block::Header { text } => text.text.clone(),
            Block::Section {
                text: Text::Mrkdwn { text },
            } => text.clone(),
            Block::Context { elements } => elements
                .iter()
                .map(|ContextElement::Mrkdwn { text }| text.clone())
                .collect(),
            Block::Divider => String::new(),
        }
    }

    #[test]
    fn test_order_message_contents() {
        let blocks = build_order_message(OrderId::new(42), &order(None, Decimal::new(9, 0), Decimal::new(1, 0)), "$");
        let all: Vec<String> = blocks.iter().map(text_of).collect();
        let all = all.join("\n");

        assert!(all.contains("New Order #42"));
        assert!(all.contains("Customer: Aroha"));
        assert!(all.contains("1. Chips x2 ($9.00)"));
        assert!(all.contains("Total: $10.00"));
        assert!(all.contains("minimum order top-up"));
        assert!(all.contains("Delivery Charge: $10.00"));
        assert!(all.contains("Grand Total: $20.00"));
        assert!(all.contains("Special Instructions: None"));
    }

    #[test]
    fn test_order_message_includes_instructions() {
        let blocks = build_order_message(
            OrderId::new(1),
            &order(Some("Leave at the gate"), Decimal::new(20, 0), Decimal::ZERO),
            "$",
        );
        let all: String = blocks.iter().map(text_of).collect();
        assert!(all.contains("Special Instructions: Leave at the gate"));
        assert!(!all.contains("top-up"));
    }
}
