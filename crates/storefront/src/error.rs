//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Errors render as JSON:
//!
//! ```json
//! { "error": "Some items are no longer available", "code": "inventory_changed",
//!   "adjustments": [{ "product_id": 3, "name": "Chips", "requested": 4, "available": 2 }] }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use nightowl_core::CustomerError;

use crate::db::RepositoryError;
use crate::services::{CheckoutError, GeocodeError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Address lookup failed.
    #[error("Geocoding error: {0}")]
    Geocode(#[from] GeocodeError),

    /// Customer details were invalid.
    #[error("Invalid customer details: {0}")]
    Customer(#[from] CustomerError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Site is in maintenance mode.
    #[error("We're currently performing maintenance. Please check back soon.")]
    Maintenance,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Checkout(err) => match err {
                CheckoutError::EmptyCart | CheckoutError::PaymentMismatch(_) => {
                    StatusCode::BAD_REQUEST
                }
                CheckoutError::StoreClosed { .. }
                | CheckoutError::InventoryChanged(_)
                | CheckoutError::OrderNotPending { .. } => StatusCode::CONFLICT,
                CheckoutError::PaymentDeclined(_) => StatusCode::PAYMENT_REQUIRED,
                CheckoutError::OrderNotFound(_) => StatusCode::NOT_FOUND,
                CheckoutError::PaymentSetupFailed(_) | CheckoutError::PaymentStatusUnavailable(_) => {
                    StatusCode::BAD_GATEWAY
                }
                CheckoutError::OrderCommitFailed(_)
                | CheckoutError::Store(_)
                | CheckoutError::Schedule(_)
                | CheckoutError::Amount(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Geocode(GeocodeError::AddressNotFound(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Geocode(_) => StatusCode::BAD_GATEWAY,
            Self::Customer(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Maintenance => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => "internal",
            Self::Checkout(err) => match err {
                CheckoutError::EmptyCart => "empty_cart",
                CheckoutError::StoreClosed { .. } => "store_closed",
                CheckoutError::InventoryChanged(_) => "inventory_changed",
                CheckoutError::PaymentSetupFailed(_) => "payment_setup_failed",
                CheckoutError::OrderCommitFailed(_) => "order_commit_failed",
                CheckoutError::PaymentDeclined(_) => "payment_declined",
                CheckoutError::PaymentStatusUnavailable(_) => "payment_status_unavailable",
                CheckoutError::PaymentMismatch(_) => "payment_mismatch",
                CheckoutError::OrderNotFound(_) => "order_not_found",
                CheckoutError::OrderNotPending { .. } => "order_not_pending",
                CheckoutError::Store(_) | CheckoutError::Schedule(_) | CheckoutError::Amount(_) => {
                    "internal"
                }
            },
            Self::Geocode(GeocodeError::AddressNotFound(_)) => "address_not_found",
            Self::Geocode(_) => "geocoding_unavailable",
            Self::Customer(_) => "invalid_customer",
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::RateLimited => "rate_limited",
            Self::Maintenance => "maintenance",
        }
    }

    /// Client-facing message. Internal details are never exposed.
    fn public_message(&self) -> String {
        match self {
            Self::Checkout(err) => match err {
                CheckoutError::InventoryChanged(_) => {
                    "Some items in your cart are no longer available in the requested quantity"
                        .to_string()
                }
                CheckoutError::PaymentSetupFailed(_) => {
                    "We couldn't set up your payment, please try again".to_string()
                }
                CheckoutError::PaymentStatusUnavailable(_) => {
                    "We couldn't check your payment, please try again".to_string()
                }
                CheckoutError::EmptyCart
                | CheckoutError::StoreClosed { .. }
                | CheckoutError::PaymentDeclined(_)
                | CheckoutError::PaymentMismatch(_)
                | CheckoutError::OrderNotFound(_)
                | CheckoutError::OrderNotPending { .. } => err.to_string(),
                _ => "Internal server error".to_string(),
            },
            Self::Geocode(GeocodeError::AddressNotFound(_)) => {
                "We couldn't find that address".to_string()
            }
            Self::Geocode(_) => "External service error".to_string(),
            Self::Customer(err) => err.to_string(),
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() && !matches!(self, Self::Maintenance) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let mut body = json!({
            "error": self.public_message(),
            "code": self.code(),
        });
        match &self {
            Self::Checkout(CheckoutError::InventoryChanged(shortfalls)) => {
                body["adjustments"] = json!(shortfalls);
            }
            Self::Checkout(CheckoutError::StoreClosed { next_opening }) => {
                body["next_opening"] = json!(next_opening);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for customer actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "3")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
