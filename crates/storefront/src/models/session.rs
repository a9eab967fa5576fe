//! Session-related types.
//!
//! A customer has no account. Everything that ties a browser to its
//! checkout (cart, verified address, pending order) lives in the session.

use serde::{Deserialize, Serialize};

use nightowl_core::{CustomerInfo, GeoPoint, OrderId};

/// Customer details whose address has been geocoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedCustomer {
    pub customer: CustomerInfo,
    pub location: GeoPoint,
    /// Inside the delivery zone at verification time.
    pub serviceable: bool,
}

/// The order this session is currently paying for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub order_id: OrderId,
    pub payment_intent_id: String,
}

/// Session keys.
pub mod keys {
    /// Key for the customer's [`nightowl_core::Cart`].
    pub const CART: &str = "cart";

    /// Key for the [`super::VerifiedCustomer`].
    pub const CUSTOMER: &str = "customer";

    /// Key for the [`super::PendingOrder`] awaiting payment.
    pub const PENDING_ORDER: &str = "pending_order";
}
