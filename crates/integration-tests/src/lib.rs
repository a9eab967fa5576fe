//! Integration test support for NightOwl.
//!
//! In-memory stand-ins for the storefront's external collaborators, so the
//! checkout and address flows run end to end without Postgres, Stripe,
//! Google, or Slack.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p nightowl-integration-tests
//! ```
//!
//! Every fake is a cheap `Clone` handle over shared state: hand one clone to
//! the service under test and keep another to inspect what happened.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use nightowl_core::{
    Cart, CustomerInfo, InventoryShortfall, OrderId, OrderSnapshot, OrderStatus, Product,
    ProductId,
};
use nightowl_storefront::db::RepositoryError;
use nightowl_storefront::services::{
    GeocodeError, GeocodedAddress, Geocoder, NotificationError, Notifier, OrderStore,
    PaymentConfirmer, PaymentError, PaymentIntent, PaymentProcessor, PaymentRequest,
    PaymentStatus, PendingCheckout, PlacedOrder,
};
use nightowl_storefront::settings::StoreSettings;
use nightowl_storefront::slack::SlackError;

// =============================================================================
// Fixtures
// =============================================================================

/// Store settings used across tests.
///
/// Real opening hours, a $10 minimum and $10 delivery charge, and a square
/// delivery zone around Akaroa.
pub const TEST_STORE_YAML: &str = r#"
name: NightOwl
title: NightOwl - Late Night Delivery Service
currency: nzd
locality: Akaroa
delivery:
  min_minutes: 30
  max_minutes: 45
  note: usually quicker
  min_order_value: "10.00"
  charge: "10.00"
opening_soon_minutes: 30
hours:
  monday: { open: "07:30", close: "17:40" }
  tuesday: { open: "15:08", close: "23:00" }
  wednesday: { open: "08:00", close: "23:00" }
  thursday: { open: "14:37", close: "21:40" }
  friday: { open: "08:08", close: "00:00" }
  saturday: { open: "05:46", close: "22:30" }
  sunday: { open: "14:00", close: "20:12" }
service_area:
  - { lat: -43.820, lng: 172.940 }
  - { lat: -43.790, lng: 172.940 }
  - { lat: -43.790, lng: 172.990 }
  - { lat: -43.820, lng: 172.990 }
"#;

/// Parsed [`TEST_STORE_YAML`].
///
/// # Panics
///
/// Panics if the fixture YAML is invalid.
#[must_use]
pub fn test_settings() -> StoreSettings {
    StoreSettings::from_yaml(TEST_STORE_YAML).expect("test settings are valid")
}

/// A local date-time in October 2026 (the 12th is a Monday).
///
/// # Panics
///
/// Panics on an invalid date or time.
#[must_use]
pub fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, day)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .expect("valid test time")
}

/// Wednesday 9pm, inside opening hours.
#[must_use]
pub fn wednesday_evening() -> NaiveDateTime {
    at(14, 21, 0)
}

/// A valid customer inside the delivery zone.
///
/// # Panics
///
/// Panics if the fixture details are invalid.
#[must_use]
pub fn customer() -> CustomerInfo {
    CustomerInfo::new(
        "Kiri Tane",
        "021 555 0199",
        "12 Rue Lavaud, Akaroa",
        Some("Leave at the door"),
    )
    .expect("test customer is valid")
}

/// A listable product.
#[must_use]
pub fn product(id: i32, name: &str, price: Decimal, inventory: i32) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        price,
        inventory,
        category_id: None,
        category_name: Some("Snacks".to_string()),
        image: None,
        visible: true,
        supplier: None,
        description: None,
    }
}

/// A cart holding `quantity` of each product.
#[must_use]
pub fn cart_with(items: &[(&Product, u32)]) -> Cart {
    let mut cart = Cart::new();
    for (product, quantity) in items {
        cart.add_line(product.id, product.price, &product.name);
        cart.set_quantity(product.id, *quantity);
    }
    cart
}

// =============================================================================
// Order Store
// =============================================================================

#[derive(Default)]
struct StoreInner {
    inventory: HashMap<ProductId, i32>,
    orders: BTreeMap<OrderId, PlacedOrder>,
    next_id: i32,
    /// Stock sold to someone else just before the next commit.
    sell_before_commit: Option<(ProductId, i32)>,
    fail_commit: bool,
}

/// Order store over a `HashMap` of stock levels.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl InMemoryOrderStore {
    /// A store stocked with `products`.
    #[must_use]
    pub fn with_products(products: &[Product]) -> Self {
        let store = Self::default();
        {
            let mut inner = store.lock();
            inner.next_id = 1000;
            for product in products {
                inner.inventory.insert(product.id, product.inventory);
            }
        }
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        self.inner.lock().expect("order store lock")
    }

    /// Current stock for a product.
    #[must_use]
    pub fn inventory(&self, id: ProductId) -> i32 {
        self.lock().inventory.get(&id).copied().unwrap_or(0)
    }

    pub fn set_inventory(&self, id: ProductId, quantity: i32) {
        self.lock().inventory.insert(id, quantity);
    }

    /// Sell stock to another customer between the inventory check and the
    /// commit of the next order.
    pub fn sell_before_next_commit(&self, id: ProductId, remaining: i32) {
        self.lock().sell_before_commit = Some((id, remaining));
    }

    /// Make the next commit fail with a database error.
    pub fn fail_next_commit(&self) {
        self.lock().fail_commit = true;
    }

    #[must_use]
    pub fn order(&self, id: OrderId) -> Option<PlacedOrder> {
        self.lock().orders.get(&id).cloned()
    }

    #[must_use]
    pub fn orders(&self) -> Vec<PlacedOrder> {
        self.lock().orders.values().cloned().collect()
    }

    /// Settle an order behind the service's back.
    pub fn force_status(&self, id: OrderId, status: OrderStatus) {
        if let Some(order) = self.lock().orders.get_mut(&id) {
            order.status = status;
        }
    }
}

impl OrderStore for InMemoryOrderStore {
    async fn available_quantities(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, u32>, RepositoryError> {
        let inner = self.lock();
        Ok(ids
            .iter()
            .filter_map(|id| {
                inner
                    .inventory
                    .get(id)
                    .map(|qty| (*id, u32::try_from(*qty).unwrap_or(0)))
            })
            .collect())
    }

    async fn commit_order(&self, order: &OrderSnapshot) -> Result<OrderId, RepositoryError> {
        let mut inner = self.lock();

        if std::mem::take(&mut inner.fail_commit) {
            return Err(RepositoryError::Unavailable("connection reset".to_string()));
        }
        if let Some((id, remaining)) = inner.sell_before_commit.take() {
            inner.inventory.insert(id, remaining);
        }
        if inner
            .orders
            .values()
            .any(|o| o.snapshot.payment_intent_id == order.payment_intent_id)
        {
            return Err(RepositoryError::Conflict(format!(
                "payment intent {} already used",
                order.payment_intent_id
            )));
        }

        let shortfalls: Vec<InventoryShortfall> = order
            .lines
            .iter()
            .filter_map(|line| {
                let in_stock = inner.inventory.get(&line.product_id).copied().unwrap_or(0);
                let available = u32::try_from(in_stock).unwrap_or(0);
                (line.quantity > available).then(|| InventoryShortfall {
                    product_id: line.product_id,
                    name: line.name.clone(),
                    requested: line.quantity,
                    available,
                })
            })
            .collect();
        if !shortfalls.is_empty() {
            return Err(RepositoryError::InsufficientStock(shortfalls));
        }

        for line in &order.lines {
            let quantity = i32::try_from(line.quantity).unwrap_or(i32::MAX);
            *inner.inventory.entry(line.product_id).or_insert(0) -= quantity;
        }

        inner.next_id += 1;
        let id = OrderId::new(inner.next_id);
        inner.orders.insert(
            id,
            PlacedOrder {
                id,
                status: OrderStatus::Pending,
                snapshot: order.clone(),
            },
        );
        Ok(id)
    }

    async fn load_order(&self, id: OrderId) -> Result<Option<PlacedOrder>, RepositoryError> {
        Ok(self.order(id))
    }

    async fn mark_confirmed(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let mut inner = self.lock();
        match inner.orders.get_mut(&id) {
            Some(order) if order.status == OrderStatus::Pending => {
                order.status = OrderStatus::Confirmed;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn abandon_order(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let mut inner = self.lock();
        let lines = match inner.orders.get_mut(&id) {
            Some(order) if order.status == OrderStatus::Pending => {
                order.status = OrderStatus::Abandoned;
                order.snapshot.lines.clone()
            }
            _ => return Ok(false),
        };
        for line in lines {
            let quantity = i32::try_from(line.quantity).unwrap_or(i32::MAX);
            *inner.inventory.entry(line.product_id).or_insert(0) += quantity;
        }
        Ok(true)
    }
}

// =============================================================================
// Payments
// =============================================================================

struct PaymentsInner {
    status: Mutex<PaymentStatus>,
    fail_create: AtomicBool,
    fail_status: AtomicBool,
    counter: AtomicU32,
    /// `(intent id, amount in minor units, metadata item count)`
    created: Mutex<Vec<(String, i64, usize)>>,
    cancelled: Mutex<Vec<String>>,
}

/// Payment processor that records intents and reports a settable status.
#[derive(Clone)]
pub struct FakePayments {
    inner: Arc<PaymentsInner>,
}

impl Default for FakePayments {
    fn default() -> Self {
        Self {
            inner: Arc::new(PaymentsInner {
                status: Mutex::new(PaymentStatus::RequiresPaymentMethod),
                fail_create: AtomicBool::new(false),
                fail_status: AtomicBool::new(false),
                counter: AtomicU32::new(0),
                created: Mutex::new(Vec::new()),
                cancelled: Mutex::new(Vec::new()),
            }),
        }
    }
}

impl FakePayments {
    /// The status every intent reports from now on.
    pub fn set_status(&self, status: PaymentStatus) {
        *self.inner.status.lock().expect("status lock") = status;
    }

    pub fn fail_create(&self) {
        self.inner.fail_create.store(true, Ordering::SeqCst);
    }

    pub fn fail_status(&self) {
        self.inner.fail_status.store(true, Ordering::SeqCst);
    }

    /// Amounts, in minor units, of every intent created.
    #[must_use]
    pub fn charged_amounts(&self) -> Vec<i64> {
        self.inner
            .created
            .lock()
            .expect("created lock")
            .iter()
            .map(|(_, amount, _)| *amount)
            .collect()
    }

    #[must_use]
    pub fn cancelled(&self) -> Vec<String> {
        self.inner.cancelled.lock().expect("cancelled lock").clone()
    }
}

impl PaymentProcessor for FakePayments {
    async fn create_payment_intent(
        &self,
        request: &PaymentRequest<'_>,
    ) -> Result<PaymentIntent, PaymentError> {
        if self.inner.fail_create.load(Ordering::SeqCst) {
            return Err(PaymentError::Api {
                status: 500,
                message: "processor unavailable".to_string(),
            });
        }
        let n = self.inner.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("pi_test_{n}");
        self.inner.created.lock().expect("created lock").push((
            id.clone(),
            request.amount_minor,
            request.items.len(),
        ));
        Ok(PaymentIntent {
            client_secret: format!("{id}_secret_abc"),
            id,
        })
    }

    async fn payment_status(&self, _payment_intent_id: &str) -> Result<PaymentStatus, PaymentError> {
        if self.inner.fail_status.load(Ordering::SeqCst) {
            return Err(PaymentError::Parse("truncated response".to_string()));
        }
        Ok(*self.inner.status.lock().expect("status lock"))
    }

    async fn cancel_payment_intent(&self, payment_intent_id: &str) -> Result<(), PaymentError> {
        self.inner
            .cancelled
            .lock()
            .expect("cancelled lock")
            .push(payment_intent_id.to_string());
        Ok(())
    }
}

/// Plays the customer's browser: confirms (or fails to confirm) the card.
pub struct FakeConfirmer {
    payments: FakePayments,
    outcome: PaymentStatus,
    decline: bool,
}

impl FakeConfirmer {
    /// Confirms successfully.
    #[must_use]
    pub const fn approving(payments: FakePayments) -> Self {
        Self {
            payments,
            outcome: PaymentStatus::Succeeded,
            decline: false,
        }
    }

    /// The card is declined before the intent settles.
    #[must_use]
    pub const fn declining(payments: FakePayments) -> Self {
        Self {
            payments,
            outcome: PaymentStatus::RequiresPaymentMethod,
            decline: true,
        }
    }

    /// Confirmation "succeeds" but the intent ends in `outcome`.
    #[must_use]
    pub const fn settling_as(payments: FakePayments, outcome: PaymentStatus) -> Self {
        Self {
            payments,
            outcome,
            decline: false,
        }
    }
}

impl PaymentConfirmer for FakeConfirmer {
    async fn confirm(&self, _pending: &PendingCheckout) -> Result<(), PaymentError> {
        self.payments.set_status(self.outcome);
        if self.decline {
            return Err(PaymentError::Declined("Your card was declined.".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Notifications
// =============================================================================

#[derive(Default)]
struct NotifierInner {
    sent: Mutex<Vec<(OrderId, OrderSnapshot)>>,
    fail: AtomicBool,
}

/// Notifier that records every order it is told about.
#[derive(Clone, Default)]
pub struct FakeNotifier {
    inner: Arc<NotifierInner>,
}

impl FakeNotifier {
    pub fn fail(&self) {
        self.inner.fail.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn sent(&self) -> Vec<(OrderId, OrderSnapshot)> {
        self.inner.sent.lock().expect("sent lock").clone()
    }
}

impl Notifier for FakeNotifier {
    async fn notify_order(
        &self,
        order_id: OrderId,
        order: &OrderSnapshot,
    ) -> Result<(), NotificationError> {
        if self.inner.fail.load(Ordering::SeqCst) {
            return Err(SlackError::Api("channel_not_found".to_string()).into());
        }
        self.inner
            .sent
            .lock()
            .expect("sent lock")
            .push((order_id, order.clone()));
        Ok(())
    }
}

// =============================================================================
// Geocoding
// =============================================================================

/// Geocoder backed by a fixed table of addresses.
#[derive(Clone, Default)]
pub struct FakeGeocoder {
    known: Arc<HashMap<String, GeocodedAddress>>,
    calls: Arc<AtomicU32>,
    unavailable: bool,
}

impl FakeGeocoder {
    /// Resolves each `(input, formatted, (lat, lng))`.
    #[must_use]
    pub fn with_addresses(addresses: &[(&str, &str, (f64, f64))]) -> Self {
        let known = addresses
            .iter()
            .map(|(input, formatted, (lat, lng))| {
                (
                    (*input).to_string(),
                    GeocodedAddress {
                        formatted_address: (*formatted).to_string(),
                        location: nightowl_core::GeoPoint::new(*lat, *lng),
                    },
                )
            })
            .collect();
        Self {
            known: Arc::new(known),
            ..Self::default()
        }
    }

    /// Every lookup fails as if the API were down.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Geocoder for FakeGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeocodedAddress, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(GeocodeError::Api("OVER_QUERY_LIMIT".to_string()));
        }
        self.known
            .get(address)
            .cloned()
            .ok_or_else(|| GeocodeError::AddressNotFound(address.to_string()))
    }
}
