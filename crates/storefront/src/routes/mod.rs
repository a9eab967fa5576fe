//! HTTP route handlers for storefront.
//!
//! All endpoints speak JSON. Errors render through [`AppError`].
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (database)
//!
//! # Store
//! GET  /api/store              - Store info, delivery terms, weekly hours
//! GET  /api/store/status       - Open/closed now, countdown to next opening
//! GET  /api/service-area       - Delivery zone polygon
//!
//! # Catalog
//! GET  /api/products           - Listable products (?category=&q=)
//!
//! # Address (rate limited)
//! POST /api/address/verify     - Geocode and check the delivery zone
//!
//! # Cart (session)
//! GET  /api/cart               - Cart with totals
//! POST /api/cart/add           - Add units (clamped to stock)
//! POST /api/cart/update        - Set quantity (clamped to stock)
//! POST /api/cart/remove        - Remove a line
//! POST /api/cart/clear         - Empty the cart
//!
//! # Checkout (rate limited)
//! POST /api/checkout           - Reserve stock, create payment intent
//! POST /api/checkout/confirm   - Settle after client-side payment
//! POST /api/checkout/abandon   - Cancel and restock
//! ```
//!
//! [`AppError`]: crate::error::AppError

pub mod address;
pub mod cart;
pub mod checkout;
pub mod products;
pub mod store;

use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::middleware::{
    address_rate_limiter, checkout_rate_limiter, maintenance_middleware, request_id_middleware,
};
use crate::state::AppState;

/// Create the store information routes router.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/api/store", get(store::info))
        .route("/api/store/status", get(store::status))
        .route("/api/service-area", get(store::service_area))
        .route("/api/products", get(products::index))
}

/// Create the address verification router.
pub fn address_routes() -> Router<AppState> {
    Router::new()
        .route("/api/address/verify", post(address::verify))
        .layer(address_rate_limiter())
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/api/checkout", post(checkout::begin))
        .route("/api/checkout/confirm", post(checkout::confirm))
        .route("/api/checkout/abandon", post(checkout::abandon))
        .layer(checkout_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(store_routes())
        .merge(address_routes())
        .nest("/api/cart", cart_routes())
        .merge(checkout_routes())
}

/// Build the application with its middleware stack.
///
/// Sentry layers are added by the binary, outside this stack.
pub fn app<S>(state: AppState, sessions: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    routes()
        .layer(sessions)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            maintenance_middleware,
        ))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
