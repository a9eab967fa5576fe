//! Integration tests for the checkout flow.
//!
//! These run `CheckoutService` end to end against the in-memory order
//! store, payment processor, and notifier.

use std::sync::Arc;

use chrono::TimeDelta;
use rust_decimal::Decimal;

use nightowl_core::{OpeningDay, OrderStatus, Product, ProductId};
use nightowl_integration_tests::{
    FakeConfirmer, FakeNotifier, FakePayments, InMemoryOrderStore, at, cart_with, customer,
    product, test_settings, wednesday_evening,
};
use nightowl_storefront::services::{CheckoutError, CheckoutService, PaymentStatus};

type Service = CheckoutService<InMemoryOrderStore, FakePayments, FakeNotifier>;

struct Harness {
    service: Service,
    store: InMemoryOrderStore,
    payments: FakePayments,
    notifier: FakeNotifier,
}

fn harness(products: &[Product]) -> Harness {
    let store = InMemoryOrderStore::with_products(products);
    let payments = FakePayments::default();
    let notifier = FakeNotifier::default();
    let service = CheckoutService::new(
        store.clone(),
        payments.clone(),
        notifier.clone(),
        Arc::new(test_settings()),
    );
    Harness {
        service,
        store,
        payments,
        notifier,
    }
}

fn chips() -> Product {
    product(1, "Chips", Decimal::new(350, 2), 10)
}

fn milk() -> Product {
    product(2, "Milk", Decimal::new(400, 2), 2)
}

// =============================================================================
// Happy Path
// =============================================================================

#[tokio::test]
async fn test_small_order_is_topped_up_and_charged_in_cents() {
    let (chips, milk) = (chips(), milk());
    let h = harness(&[chips.clone(), milk.clone()]);
    // $3.50 + $4.00 = $7.50, topped up to $10, plus $10 delivery
    let cart = cart_with(&[(&chips, 1), (&milk, 1)]);

    let pending = h
        .service
        .begin(&cart, &customer(), wednesday_evening())
        .await
        .expect("checkout starts");

    assert_eq!(pending.totals.subtotal, Decimal::new(750, 2));
    assert_eq!(pending.totals.top_up, Decimal::new(250, 2));
    assert_eq!(pending.totals.total, Decimal::new(20, 0));
    assert_eq!(pending.amount_minor, 2000);
    assert_eq!(h.payments.charged_amounts(), vec![2000]);
    assert!(pending.client_secret.starts_with(&pending.payment_intent_id));
}

#[tokio::test]
async fn test_seven_dollar_cart_charges_minimum_plus_delivery() {
    let snack = product(3, "Snack Bar", Decimal::new(7, 0), 5);
    let h = harness(&[snack.clone()]);
    let cart = cart_with(&[(&snack, 1)]);

    let pending = h
        .service
        .begin(&cart, &customer(), wednesday_evening())
        .await
        .expect("checkout starts");

    assert_eq!(pending.totals.top_up, Decimal::new(3, 0));
    assert_eq!(pending.amount_minor, 2000);
}

#[tokio::test]
async fn test_checkout_reserves_stock_confirms_and_notifies() {
    let chips = chips();
    let h = harness(&[chips.clone()]);
    let cart = cart_with(&[(&chips, 4)]);
    let now = wednesday_evening();

    let confirmation = h
        .service
        .checkout(&cart, &customer(), &FakeConfirmer::approving(h.payments.clone()), now)
        .await
        .expect("checkout succeeds");

    // 30-45 minute window: midpoint is 37m30s
    assert_eq!(
        confirmation.expected_delivery_time,
        now + TimeDelta::seconds(37 * 60 + 30)
    );
    assert_eq!(h.store.inventory(chips.id), 6);

    let order = h.store.order(confirmation.order_id).expect("order stored");
    assert_eq!(order.status, OrderStatus::Confirmed);
    assert_eq!(order.snapshot.customer.name, "Kiri Tane");
    assert_eq!(order.snapshot.lines.len(), 1);

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent.first().map(|(id, _)| *id), Some(confirmation.order_id));
}

#[tokio::test]
async fn test_complete_is_idempotent_for_confirmed_orders() {
    let chips = chips();
    let h = harness(&[chips.clone()]);
    let cart = cart_with(&[(&chips, 3)]);

    let pending = h
        .service
        .begin(&cart, &customer(), wednesday_evening())
        .await
        .expect("checkout starts");
    h.payments.set_status(PaymentStatus::Succeeded);

    let first = h
        .service
        .complete(pending.order_id, &pending.payment_intent_id, wednesday_evening())
        .await
        .expect("first completion");
    let second = h
        .service
        .complete(pending.order_id, &pending.payment_intent_id, wednesday_evening())
        .await
        .expect("second completion");

    assert_eq!(first, second);
    assert_eq!(h.notifier.sent().len(), 1, "notified once");
    assert_eq!(h.store.inventory(chips.id), 7, "stock taken once");
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_checkout() {
    let chips = chips();
    let h = harness(&[chips.clone()]);
    h.notifier.fail();
    let cart = cart_with(&[(&chips, 3)]);

    let confirmation = h
        .service
        .checkout(
            &cart,
            &customer(),
            &FakeConfirmer::approving(h.payments.clone()),
            wednesday_evening(),
        )
        .await
        .expect("checkout succeeds without a notification");

    let order = h.store.order(confirmation.order_id).expect("order stored");
    assert_eq!(order.status, OrderStatus::Confirmed);
    assert!(h.notifier.sent().is_empty());
}

// =============================================================================
// Preconditions
// =============================================================================

#[tokio::test]
async fn test_empty_cart_is_rejected() {
    let h = harness(&[chips()]);
    let result = h
        .service
        .begin(&nightowl_core::Cart::new(), &customer(), wednesday_evening())
        .await;

    assert!(matches!(result, Err(CheckoutError::EmptyCart)));
    assert!(h.payments.charged_amounts().is_empty());
}

#[tokio::test]
async fn test_closed_store_reports_next_opening() {
    let chips = chips();
    let h = harness(&[chips.clone()]);
    let cart = cart_with(&[(&chips, 3)]);
    // Monday 8pm: closed since 5:40pm, Tuesday opens 3:08pm
    let result = h.service.begin(&cart, &customer(), at(12, 20, 0)).await;

    match result {
        Err(CheckoutError::StoreClosed { next_opening }) => {
            assert_eq!(next_opening.day, OpeningDay::Tomorrow);
            assert_eq!(next_opening.time.to_12_hour(), "3:08 PM");
            assert_eq!(next_opening.seconds_until_open, (19 * 60 + 8) * 60);
        }
        other => panic!("expected StoreClosed, got {other:?}"),
    }
    assert!(h.payments.charged_amounts().is_empty());
}

// =============================================================================
// Inventory
// =============================================================================

#[tokio::test]
async fn test_cart_over_stock_reports_shortfalls_without_charging() {
    let (chips, milk) = (chips(), milk());
    let h = harness(&[chips.clone(), milk.clone()]);
    let cart = cart_with(&[(&chips, 2), (&milk, 5)]);

    let result = h.service.begin(&cart, &customer(), wednesday_evening()).await;

    match result {
        Err(CheckoutError::InventoryChanged(shortfalls)) => {
            assert_eq!(shortfalls.len(), 1);
            let shortfall = shortfalls.first().expect("one shortfall");
            assert_eq!(shortfall.product_id, milk.id);
            assert_eq!(shortfall.requested, 5);
            assert_eq!(shortfall.available, 2);
        }
        other => panic!("expected InventoryChanged, got {other:?}"),
    }
    assert!(h.payments.charged_amounts().is_empty());
    assert!(h.store.orders().is_empty());
}

#[tokio::test]
async fn test_unknown_product_counts_as_out_of_stock() {
    let ghost = product(99, "Discontinued", Decimal::new(5, 0), 0);
    let h = harness(&[chips()]);
    let cart = cart_with(&[(&ghost, 1)]);

    let result = h.service.begin(&cart, &customer(), wednesday_evening()).await;

    assert!(matches!(
        result,
        Err(CheckoutError::InventoryChanged(ref s)) if s.first().is_some_and(|s| s.available == 0)
    ));
}

#[tokio::test]
async fn test_lost_race_at_commit_cancels_intent() {
    let chips = chips();
    let h = harness(&[chips.clone()]);
    let cart = cart_with(&[(&chips, 4)]);
    h.store.sell_before_next_commit(chips.id, 1);

    let result = h.service.begin(&cart, &customer(), wednesday_evening()).await;

    assert!(matches!(result, Err(CheckoutError::InventoryChanged(_))));
    assert_eq!(h.payments.charged_amounts().len(), 1);
    assert_eq!(h.payments.cancelled(), vec!["pi_test_1".to_string()]);
    assert_eq!(h.store.inventory(chips.id), 1, "no partial decrement");
    assert!(h.store.orders().is_empty());
}

#[tokio::test]
async fn test_commit_failure_cancels_intent() {
    let chips = chips();
    let h = harness(&[chips.clone()]);
    h.store.fail_next_commit();
    let cart = cart_with(&[(&chips, 3)]);

    let result = h.service.begin(&cart, &customer(), wednesday_evening()).await;

    assert!(matches!(result, Err(CheckoutError::OrderCommitFailed(_))));
    assert_eq!(h.payments.cancelled().len(), 1);
    assert_eq!(h.store.inventory(chips.id), 10);
}

// =============================================================================
// Payment Outcomes
// =============================================================================

#[tokio::test]
async fn test_payment_setup_failure_leaves_stock_untouched() {
    let chips = chips();
    let h = harness(&[chips.clone()]);
    h.payments.fail_create();
    let cart = cart_with(&[(&chips, 3)]);

    let result = h.service.begin(&cart, &customer(), wednesday_evening()).await;

    assert!(matches!(result, Err(CheckoutError::PaymentSetupFailed(_))));
    assert_eq!(h.store.inventory(chips.id), 10);
    assert!(h.store.orders().is_empty());
}

#[tokio::test]
async fn test_declined_card_abandons_and_restocks() {
    let chips = chips();
    let h = harness(&[chips.clone()]);
    let cart = cart_with(&[(&chips, 3)]);

    let result = h
        .service
        .checkout(
            &cart,
            &customer(),
            &FakeConfirmer::declining(h.payments.clone()),
            wednesday_evening(),
        )
        .await;

    assert!(matches!(result, Err(CheckoutError::PaymentDeclined(_))));
    assert_eq!(h.store.inventory(chips.id), 10);
    let orders = h.store.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders.first().map(|o| o.status), Some(OrderStatus::Abandoned));
    assert_eq!(h.payments.cancelled().len(), 1);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_canceled_intent_abandons_order() {
    let chips = chips();
    let h = harness(&[chips.clone()]);
    let cart = cart_with(&[(&chips, 3)]);

    let result = h
        .service
        .checkout(
            &cart,
            &customer(),
            &FakeConfirmer::settling_as(h.payments.clone(), PaymentStatus::Canceled),
            wednesday_evening(),
        )
        .await;

    assert!(matches!(result, Err(CheckoutError::PaymentDeclined(_))));
    assert_eq!(h.store.inventory(chips.id), 10);
    assert_eq!(
        h.store.orders().first().map(|o| o.status),
        Some(OrderStatus::Abandoned)
    );
}

#[tokio::test]
async fn test_unfinished_payment_leaves_order_pending() {
    let chips = chips();
    let h = harness(&[chips.clone()]);
    let cart = cart_with(&[(&chips, 3)]);
    let pending = h
        .service
        .begin(&cart, &customer(), wednesday_evening())
        .await
        .expect("checkout starts");
    h.payments.set_status(PaymentStatus::RequiresAction);

    let result = h
        .service
        .complete(pending.order_id, &pending.payment_intent_id, wednesday_evening())
        .await;

    assert!(matches!(result, Err(CheckoutError::PaymentDeclined(_))));
    let order = h.store.order(pending.order_id).expect("order stored");
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(h.store.inventory(chips.id), 7, "stock stays reserved");

    // The customer finishes 3D Secure and tries again.
    h.payments.set_status(PaymentStatus::Succeeded);
    let confirmation = h
        .service
        .complete(pending.order_id, &pending.payment_intent_id, wednesday_evening())
        .await
        .expect("retry succeeds");
    assert_eq!(confirmation.order_id, pending.order_id);
}

#[tokio::test]
async fn test_status_lookup_failure_is_reported() {
    let chips = chips();
    let h = harness(&[chips.clone()]);
    let pending = h
        .service
        .begin(&cart_with(&[(&chips, 3)]), &customer(), wednesday_evening())
        .await
        .expect("checkout starts");
    h.payments.fail_status();

    let result = h
        .service
        .complete(pending.order_id, &pending.payment_intent_id, wednesday_evening())
        .await;

    assert!(matches!(
        result,
        Err(CheckoutError::PaymentStatusUnavailable(_))
    ));
}

// =============================================================================
// Completion Guards
// =============================================================================

#[tokio::test]
async fn test_mismatched_payment_is_rejected() {
    let chips = chips();
    let h = harness(&[chips.clone()]);
    let pending = h
        .service
        .begin(&cart_with(&[(&chips, 3)]), &customer(), wednesday_evening())
        .await
        .expect("checkout starts");

    let result = h
        .service
        .complete(pending.order_id, "pi_someone_else", wednesday_evening())
        .await;

    assert!(matches!(result, Err(CheckoutError::PaymentMismatch(id)) if id == pending.order_id));
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let h = harness(&[chips()]);
    let result = h
        .service
        .complete(nightowl_core::OrderId::new(1), "pi_test_1", wednesday_evening())
        .await;

    assert!(matches!(result, Err(CheckoutError::OrderNotFound(_))));
}

#[tokio::test]
async fn test_abandoned_order_cannot_be_completed() {
    let chips = chips();
    let h = harness(&[chips.clone()]);
    let pending = h
        .service
        .begin(&cart_with(&[(&chips, 3)]), &customer(), wednesday_evening())
        .await
        .expect("checkout starts");

    h.service.abandon(pending.order_id).await.expect("abandon");
    assert_eq!(h.store.inventory(chips.id), 10);
    assert_eq!(h.payments.cancelled(), vec![pending.payment_intent_id.clone()]);

    h.payments.set_status(PaymentStatus::Succeeded);
    let result = h
        .service
        .complete(pending.order_id, &pending.payment_intent_id, wednesday_evening())
        .await;
    assert!(matches!(
        result,
        Err(CheckoutError::OrderNotPending {
            status: OrderStatus::Abandoned,
            ..
        })
    ));

    let again = h.service.abandon(pending.order_id).await;
    assert!(matches!(again, Err(CheckoutError::OrderNotPending { .. })));
}

#[tokio::test]
async fn test_order_settled_concurrently_is_reported() {
    let chips = chips();
    let h = harness(&[chips.clone()]);
    let pending = h
        .service
        .begin(&cart_with(&[(&chips, 3)]), &customer(), wednesday_evening())
        .await
        .expect("checkout starts");
    h.payments.set_status(PaymentStatus::Succeeded);
    h.store.force_status(pending.order_id, OrderStatus::Confirmed);

    let confirmation = h
        .service
        .complete(pending.order_id, &pending.payment_intent_id, wednesday_evening())
        .await
        .expect("already confirmed");

    assert_eq!(confirmation.order_id, pending.order_id);
    assert!(h.notifier.sent().is_empty(), "the other settler notifies");
}

#[tokio::test]
async fn test_each_checkout_gets_its_own_order() {
    let chips = chips();
    let h = harness(&[chips.clone()]);
    let cart = cart_with(&[(&chips, 3)]);

    let a = h
        .service
        .begin(&cart, &customer(), wednesday_evening())
        .await
        .expect("first");
    let b = h
        .service
        .begin(&cart, &customer(), wednesday_evening())
        .await
        .expect("second");

    assert_ne!(a.order_id, b.order_id);
    assert_ne!(a.payment_intent_id, b.payment_intent_id);
    assert_eq!(h.store.inventory(ProductId::new(1)), 4);
}
