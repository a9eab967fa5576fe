//! Business logic services for storefront.
//!
//! # Services
//!
//! - `checkout` - Inventory check, payment intent, order commit, confirmation
//! - `address` - Geocode an address and test it against the service area
//! - `catalog` - Cached product catalog
//! - `stripe` - Stripe REST client ([`PaymentProcessor`])
//! - `geocoding` - Google Geocoding client ([`Geocoder`])
//! - `notify` - Slack order notifications ([`Notifier`])
//!
//! External collaborators sit behind the traits in this module so checkout
//! and address verification run against in-memory fakes in tests.

pub mod address;
pub mod catalog;
pub mod checkout;
pub mod geocoding;
pub mod notify;
pub mod stripe;

use std::collections::HashMap;
use std::future::Future;

use serde::Deserialize;
use thiserror::Error;

use nightowl_core::{
    CustomerInfo, OrderId, OrderLine, OrderSnapshot, OrderStatus, Price, ProductId,
};

use crate::db::RepositoryError;

pub use checkout::{CheckoutError, CheckoutService, PendingCheckout};
pub use geocoding::{GeocodeError, GeocodedAddress};
pub use notify::NotificationError;

// =============================================================================
// Order store
// =============================================================================

/// An order as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub id: OrderId,
    pub status: OrderStatus,
    pub snapshot: OrderSnapshot,
}

/// Persistence for orders and the inventory they reserve.
pub trait OrderStore: Send + Sync {
    /// Current availability per product. Unknown products are absent.
    fn available_quantities(
        &self,
        ids: &[ProductId],
    ) -> impl Future<Output = Result<HashMap<ProductId, u32>, RepositoryError>> + Send;

    /// Create a pending order with its items and decrement inventory, all
    /// or nothing.
    ///
    /// Returns `RepositoryError::InsufficientStock` when a decrement would
    /// take any product below zero.
    fn commit_order(
        &self,
        order: &OrderSnapshot,
    ) -> impl Future<Output = Result<OrderId, RepositoryError>> + Send;

    fn load_order(
        &self,
        id: OrderId,
    ) -> impl Future<Output = Result<Option<PlacedOrder>, RepositoryError>> + Send;

    /// Move a pending order to confirmed. Returns `false` if it was not pending.
    fn mark_confirmed(&self, id: OrderId)
    -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Move a pending order to abandoned and return its items to stock.
    /// Returns `false` if it was not pending.
    fn abandon_order(&self, id: OrderId)
    -> impl Future<Output = Result<bool, RepositoryError>> + Send;
}

// =============================================================================
// Payments
// =============================================================================

/// Errors from the payment processor.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("payment API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The customer's payment did not go through.
    #[error("payment declined: {0}")]
    Declined(String),

    /// Failed to parse response.
    #[error("parse error: {0}")]
    Parse(String),
}

/// What to charge for.
#[derive(Debug, Clone, Copy)]
pub struct PaymentRequest<'a> {
    /// Total in major units, with currency.
    pub amount: Price,
    /// Total in integer minor units, rounded half-up.
    pub amount_minor: i64,
    pub customer: &'a CustomerInfo,
    pub items: &'a [OrderLine],
}

/// A created payment intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: String,
    /// Handed to the browser to confirm the payment client-side.
    pub client_secret: String,
}

/// Payment intent lifecycle state as reported by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::RequiresPaymentMethod => "requires a payment method",
            Self::RequiresConfirmation => "requires confirmation",
            Self::RequiresAction => "requires action",
            Self::Processing => "is processing",
            Self::RequiresCapture => "requires capture",
            Self::Canceled => "was canceled",
            Self::Succeeded => "succeeded",
            Self::Unknown => "is in an unknown state",
        };
        f.write_str(s)
    }
}

/// Card payment processing.
pub trait PaymentProcessor: Send + Sync {
    fn create_payment_intent(
        &self,
        request: &PaymentRequest<'_>,
    ) -> impl Future<Output = Result<PaymentIntent, PaymentError>> + Send;

    fn payment_status(
        &self,
        payment_intent_id: &str,
    ) -> impl Future<Output = Result<PaymentStatus, PaymentError>> + Send;

    fn cancel_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> impl Future<Output = Result<(), PaymentError>> + Send;
}

/// Confirms a payment on the customer's behalf.
///
/// In production the browser confirms with the client secret; this trait
/// stands in for that step when checkout runs end to end in one call.
pub trait PaymentConfirmer: Send + Sync {
    fn confirm(
        &self,
        pending: &PendingCheckout,
    ) -> impl Future<Output = Result<(), PaymentError>> + Send;
}

// =============================================================================
// Notifications and geocoding
// =============================================================================

/// Tells the team about new orders.
pub trait Notifier: Send + Sync {
    fn notify_order(
        &self,
        order_id: OrderId,
        order: &OrderSnapshot,
    ) -> impl Future<Output = Result<(), NotificationError>> + Send;
}

/// Resolves free-text addresses to coordinates.
pub trait Geocoder: Send + Sync {
    fn geocode(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<GeocodedAddress, GeocodeError>> + Send;
}
