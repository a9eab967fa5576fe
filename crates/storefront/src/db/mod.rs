//! Database operations for storefront `PostgreSQL`.
//!
//! ## Tables
//!
//! - `categories` - Product categories
//! - `products` - Catalog, prices, and on-hand inventory
//! - `orders` - Placed orders with customer snapshot, totals, and payment intent
//! - `order_items` - Line items of each order
//! - `tower_sessions.session` - Tower-sessions storage (cart, verified address)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p nightowl-cli -- migrate
//! ```

pub mod orders;
pub mod products;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use nightowl_core::InventoryShortfall;

pub use orders::PgOrderStore;
pub use products::{NewProduct, ProductRepository};

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Query or connection failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Row not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Unique constraint or state conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Stored data failed domain validation.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// A shared load failed for another caller.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// An inventory decrement lost a race with another order.
    #[error("insufficient stock for {} product(s)", .0.len())]
    InsufficientStock(Vec<InventoryShortfall>),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Convert a stored quantity to the unsigned domain type.
fn quantity_from_db(value: i32, what: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {what}: {value}")))
}

/// Convert a domain quantity for binding.
fn quantity_to_db(value: u32) -> Result<i32, RepositoryError> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::Conflict(format!("quantity {value} is out of range")))
}
