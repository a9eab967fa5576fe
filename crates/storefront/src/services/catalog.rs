//! Cached product catalog.
//!
//! The full product list is read from Postgres at most every 30 seconds.
//! Inventory shown from the cache may lag; checkout always re-reads stock.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;

use nightowl_core::Product;

use crate::db::{ProductRepository, RepositoryError};

/// Catalog cache lifetime.
const CATALOG_TTL: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct ProductCatalog {
    pool: PgPool,
    cache: Cache<(), Arc<Vec<Product>>>,
}

impl ProductCatalog {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(CATALOG_TTL)
            .build();
        Self { pool, cache }
    }

    /// All products, from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the products cannot be loaded.
    pub async fn products(&self) -> Result<Arc<Vec<Product>>, RepositoryError> {
        let pool = self.pool.clone();
        self.cache
            .try_get_with((), async move {
                let products = ProductRepository::new(&pool).list().await?;
                tracing::debug!(count = products.len(), "Loaded product catalog");
                Ok::<_, RepositoryError>(Arc::new(products))
            })
            .await
            .map_err(|e: Arc<RepositoryError>| {
                Arc::try_unwrap(e)
                    .unwrap_or_else(|shared| RepositoryError::Unavailable(shared.to_string()))
            })
    }

    /// Drop the cached list so the next read sees fresh inventory.
    pub async fn invalidate(&self) {
        self.cache.invalidate(&()).await;
    }
}
