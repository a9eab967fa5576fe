//! Integration tests for the Slack order summary.
//!
//! A checkout runs against the fakes, and the snapshot handed to the
//! notifier is rendered to Block Kit JSON the way Slack receives it.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::Value;

use nightowl_core::{CurrencyCode, OrderId, OrderSnapshot};
use nightowl_integration_tests::{
    FakeConfirmer, FakeNotifier, FakePayments, InMemoryOrderStore, cart_with, customer, product,
    test_settings, wednesday_evening,
};
use nightowl_storefront::services::CheckoutService;
use nightowl_storefront::slack::build_order_message;

async fn notified_order(items: &[(&nightowl_core::Product, u32)]) -> (OrderId, OrderSnapshot) {
    let products: Vec<_> = items.iter().map(|(p, _)| (*p).clone()).collect();
    let store = InMemoryOrderStore::with_products(&products);
    let payments = FakePayments::default();
    let notifier = FakeNotifier::default();
    let service = CheckoutService::new(
        store,
        payments.clone(),
        notifier.clone(),
        Arc::new(test_settings()),
    );

    service
        .checkout(
            &cart_with(items),
            &customer(),
            &FakeConfirmer::approving(payments),
            wednesday_evening(),
        )
        .await
        .expect("checkout succeeds");

    notifier.sent().into_iter().next().expect("one notification")
}

fn message_json(order_id: OrderId, order: &OrderSnapshot) -> Vec<Value> {
    let blocks = build_order_message(order_id, order, CurrencyCode::NZD.symbol());
    let json = serde_json::to_value(&blocks).expect("blocks serialize");
    json.as_array().expect("array of blocks").clone()
}

fn text(block: &Value) -> &str {
    block["text"]["text"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn test_summary_lists_customer_items_and_totals() {
    let chips = product(1, "Chips", Decimal::new(450, 2), 10);
    let milk = product(2, "Milk", Decimal::new(400, 2), 10);
    let (order_id, order) = notified_order(&[(&chips, 2), (&milk, 1)]).await;

    let blocks = message_json(order_id, &order);
    let types: Vec<&str> = blocks
        .iter()
        .filter_map(|b| b["type"].as_str())
        .collect();
    assert_eq!(
        types,
        vec![
            "header", "section", "divider", "section", "divider", "section", "divider",
            "section", "context"
        ]
    );

    let header = blocks.first().expect("header");
    assert_eq!(text(header), format!("New Order #{order_id}"));
    assert_eq!(header["text"]["type"], "plain_text");

    let customer = blocks.get(1).expect("customer section");
    assert!(text(customer).contains("Customer: Kiri Tane"));
    assert!(text(customer).contains("Phone: 021 555 0199"));
    assert!(text(customer).contains("Address: 12 Rue Lavaud, Akaroa"));

    let items = blocks.get(3).expect("items section");
    assert!(text(items).contains("1. Chips x2 ($9.00)"));
    assert!(text(items).contains("2. Milk x1 ($4.00)"));

    let totals = blocks.get(5).expect("totals section");
    assert!(text(totals).contains("Total: $13.00"));
    assert!(!text(totals).contains("top-up"));
    assert!(text(totals).contains("Delivery Charge: $10.00"));
    assert!(text(totals).contains("Grand Total: $23.00"));

    let instructions = blocks.get(7).expect("instructions section");
    assert!(text(instructions).contains("Special Instructions: Leave at the door"));
}

#[tokio::test]
async fn test_summary_shows_minimum_order_top_up() {
    let snack = product(3, "Snack Bar", Decimal::new(7, 0), 5);
    let (order_id, order) = notified_order(&[(&snack, 1)]).await;

    let blocks = message_json(order_id, &order);
    let totals = blocks.get(5).expect("totals section");

    assert!(text(totals).contains("Total: $10.00"));
    assert!(text(totals).contains("$3.00 minimum order top-up"));
    assert!(text(totals).contains("Grand Total: $20.00"));
}
