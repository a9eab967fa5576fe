//! Integration tests for the storefront HTTP routes.
//!
//! The router runs in-process with `tower::ServiceExt::oneshot`, a pinned
//! clock, and in-memory sessions. The database pool is lazy and points at a
//! closed port, so only routes that never reach Postgres are exercised
//! here; checkout against the database is covered by the service tests.

use std::path::PathBuf;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::routing::post;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, Session};

use nightowl_core::{Cart, ProductId};
use nightowl_integration_tests::{at, test_settings, wednesday_evening};
use nightowl_storefront::config::{StorefrontConfig, StripeConfig};
use nightowl_storefront::middleware::session_layer;
use nightowl_storefront::models::keys;
use nightowl_storefront::routes;
use nightowl_storefront::state::{AppState, Clock};

fn config(maintenance_mode: bool) -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://nightowl@127.0.0.1:1/nightowl"),
        host: "127.0.0.1".parse().expect("valid ip"),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        store_config_path: PathBuf::from("unused.yaml"),
        maintenance_mode,
        stripe: StripeConfig {
            secret_key: SecretString::from("sk_test_51HqLyjWDarjtT1zdp7dc"),
            api_base: "http://127.0.0.1:1".to_string(),
        },
        slack: None,
        google_maps_api_key: SecretString::from("AIzaSyD-maps-key-value"),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

fn app_with(clock: Clock, maintenance_mode: bool) -> Router {
    app_with_store(clock, maintenance_mode, MemoryStore::default())
}

fn app_with_store(clock: Clock, maintenance_mode: bool, sessions: MemoryStore) -> Router {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(500))
        .connect_lazy("postgres://nightowl@127.0.0.1:1/nightowl")
        .expect("lazy pool");
    let state = AppState::new(config(maintenance_mode), test_settings(), pool, clock)
        .expect("state builds");
    routes::app(state, session_layer(sessions, false))
}

/// Put two bags of chips in a fresh session and return its cookie.
async fn seeded_cart_cookie(sessions: &MemoryStore) -> String {
    async fn seed(session: Session) -> StatusCode {
        let mut cart = Cart::new();
        cart.add_line(ProductId::new(1), Decimal::new(450, 2), "Chips");
        cart.set_quantity(ProductId::new(1), 2);
        session.insert(keys::CART, &cart).await.expect("cart stored");
        StatusCode::OK
    }

    let seeder = Router::new()
        .route("/seed", post(seed))
        .layer(session_layer(sessions.clone(), false));
    let response = seeder
        .oneshot(post_json("/seed", &json!({})))
        .await
        .expect("response");

    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .expect("session cookie")
        .to_string()
}

fn with_cookie(mut request: Request<Body>, cookie: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().expect("cookie header"));
    request
}

fn app() -> Router {
    app_with(Clock::Fixed(wednesday_evening()), false)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-real-ip", "203.0.113.7")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_is_ok_and_tagged_with_request_id() {
    let response = app().oneshot(get("/health")).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_upstream_request_id_is_echoed() {
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "cf-8a1b2c")
        .body(Body::empty())
        .expect("request");
    let response = app().oneshot(request).await.expect("response");

    assert_eq!(response.headers()["x-request-id"], "cf-8a1b2c");
}

#[tokio::test]
async fn test_readiness_fails_without_database() {
    let response = app().oneshot(get("/health/ready")).await.expect("response");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// =============================================================================
// Store
// =============================================================================

#[tokio::test]
async fn test_store_info_lists_terms_and_hours() {
    let response = app().oneshot(get("/api/store")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["name"], "NightOwl");
    assert_eq!(body["delivery"]["window"], "30-45 minutes");
    assert_eq!(body["delivery"]["min_order_value"], "10.00");
    assert_eq!(body["hours"].as_array().map(Vec::len), Some(7));
    assert_eq!(body["hours"][0]["day"], "sunday");
    assert_eq!(body["hours"][1]["day"], "monday");
    assert_eq!(body["hours"][1]["display"], "7:30 AM - 5:40 PM");
    assert_eq!(body["hours"][5]["display"], "8:08 AM - 12:00 AM");
}

#[tokio::test]
async fn test_store_status_open() {
    let response = app().oneshot(get("/api/store/status")).await.expect("response");
    let body = json_body(response).await;

    assert_eq!(body["state"], "OPEN");
    assert_eq!(body["is_open"], true);
    assert_eq!(body["closing_time"], "23:00");
    assert_eq!(body["closing_time_display"], "11:00 PM");
    assert!(body["next_opening"].is_null());
}

#[tokio::test]
async fn test_store_status_closed_with_countdown() {
    // Monday 6pm
    let app = app_with(Clock::Fixed(at(12, 18, 0)), false);
    let response = app.oneshot(get("/api/store/status")).await.expect("response");
    let body = json_body(response).await;

    assert_eq!(body["state"], "CLOSED");
    assert_eq!(body["is_open"], false);
    assert_eq!(body["next_opening"]["day"], "tomorrow");
    assert_eq!(body["next_opening"]["time_display"], "3:08 PM");
    assert_eq!(body["next_opening"]["countdown"], "21h 8m");
}

#[tokio::test]
async fn test_service_area_has_polygon_and_centroid() {
    let response = app().oneshot(get("/api/service-area")).await.expect("response");
    let body = json_body(response).await;

    assert_eq!(body["polygon"].as_array().map(Vec::len), Some(4));
    assert!(body["centroid"]["lat"].is_number());
    assert!(body["bounding_box"].is_object());
}

// =============================================================================
// Cart
// =============================================================================

#[tokio::test]
async fn test_new_session_has_empty_cart() {
    let response = app().oneshot(get("/api/cart")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["item_count"], 0);
    assert_eq!(body["lines"], json!([]));
    assert_eq!(body["meets_minimum"], false);
    assert_eq!(body["totals"]["top_up"], "10.00");
}

#[tokio::test]
async fn test_clearing_cart_starts_a_session() {
    let response = app()
        .oneshot(post_json("/api/cart/clear", &json!({})))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(cookie.starts_with("nightowl_session="));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn test_updating_absent_line_is_not_found() {
    let response = app()
        .oneshot(post_json(
            "/api/cart/update",
            &json!({ "product_id": 7, "quantity": 2 }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["code"], "not_found");
}

#[tokio::test]
async fn test_removing_absent_line_is_a_no_op() {
    let response = app()
        .oneshot(post_json("/api/cart/remove", &json!({ "product_id": 7 })))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["item_count"], 0);
}

#[tokio::test]
async fn test_update_keeps_line_when_stock_cannot_be_read() {
    let sessions = MemoryStore::default();
    let cookie = seeded_cart_cookie(&sessions).await;
    let app = app_with_store(Clock::Fixed(wednesday_evening()), false, sessions);

    let response = app
        .clone()
        .oneshot(with_cookie(
            post_json(
                "/api/cart/update",
                &json!({ "product_id": 1, "quantity": 3 }),
            ),
            &cookie,
        ))
        .await
        .expect("response");
    assert!(response.status().is_server_error());

    let response = app
        .oneshot(with_cookie(get("/api/cart"), &cookie))
        .await
        .expect("response");
    let body = json_body(response).await;
    assert_eq!(body["item_count"], 2);
    assert_eq!(body["lines"][0]["product_id"], 1);
    assert_eq!(body["lines"][0]["quantity"], 2);
}

// =============================================================================
// Address and Checkout
// =============================================================================

#[tokio::test]
async fn test_invalid_customer_details_are_rejected() {
    let response = app()
        .oneshot(post_json(
            "/api/address/verify",
            &json!({ "name": "Kiri", "phone": "call me", "address": "12 Rue Lavaud" }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "invalid_customer");
}

#[tokio::test]
async fn test_checkout_requires_verified_address() {
    let response = app()
        .oneshot(post_json("/api/checkout", &json!({})))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "Bad request: Verify your delivery address first"
    );
}

#[tokio::test]
async fn test_confirm_without_checkout_is_rejected() {
    let response = app()
        .oneshot(post_json("/api/checkout/confirm", &json!({})))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Maintenance
// =============================================================================

#[tokio::test]
async fn test_maintenance_mode_blocks_api_but_not_health() {
    let app = app_with(Clock::Fixed(wednesday_evening()), true);

    let blocked = app
        .clone()
        .oneshot(get("/api/store"))
        .await
        .expect("response");
    assert_eq!(blocked.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(blocked).await["code"], "maintenance");

    let health = app.oneshot(get("/health")).await.expect("response");
    assert_eq!(health.status(), StatusCode::OK);
}
