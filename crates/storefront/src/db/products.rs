//! Product catalog repository.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use nightowl_core::{CategoryId, Product, ProductId};

use super::{RepositoryError, quantity_from_db, quantity_to_db};

/// Raw product row with its category name joined in.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    price: Decimal,
    inventory: i32,
    category_id: Option<CategoryId>,
    category_name: Option<String>,
    image: Option<String>,
    visible: bool,
    supplier: Option<String>,
    description: Option<String>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            price: row.price,
            inventory: row.inventory,
            category_id: row.category_id,
            category_name: row.category_name,
            image: row.image,
            visible: row.visible,
            supplier: row.supplier,
            description: row.description,
        }
    }
}

const SELECT_PRODUCTS: &str = r"
    SELECT p.id, p.name, p.price, p.inventory, p.category_id,
           c.name AS category_name, p.image, p.visible, p.supplier,
           p.description
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
";

/// A product definition used for seeding the catalog.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Decimal,
    pub inventory: u32,
    pub category: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

const fn default_visible() -> bool {
    true
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All products ordered by category and name.
    ///
    /// Visibility and stock filtering happen in `CatalogFilter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> =
            sqlx::query_as(&format!("{SELECT_PRODUCTS} ORDER BY c.name NULLS LAST, p.name"))
                .fetch_all(self.pool)
                .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("{SELECT_PRODUCTS} WHERE p.id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        Ok(row.map(Product::from))
    }

    /// Current on-hand inventory for the given products.
    ///
    /// Unknown products are absent from the map.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(count = ids.len()))]
    pub async fn available_quantities(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, u32>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows: Vec<(ProductId, i32)> =
            sqlx::query_as("SELECT id, inventory FROM products WHERE id = ANY($1)")
                .bind(&raw)
                .fetch_all(self.pool)
                .await?;

        rows.into_iter()
            .map(|(id, inventory)| Ok((id, quantity_from_db(inventory.max(0), "inventory")?)))
            .collect()
    }

    /// Insert or update a category by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_category(&self, name: &str) -> Result<CategoryId, RepositoryError> {
        let (id,): (CategoryId,) = sqlx::query_as(
            r"
            INSERT INTO categories (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            ",
        )
        .bind(name)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Insert or update a product by name, setting its inventory.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn upsert(&self, product: &NewProduct) -> Result<ProductId, RepositoryError> {
        let category_id = match product.category.as_deref() {
            Some(name) if !name.trim().is_empty() => Some(self.upsert_category(name.trim()).await?),
            _ => None,
        };

        let (id,): (ProductId,) = sqlx::query_as(
            r"
            INSERT INTO products
                (name, price, inventory, category_id, image, visible, supplier, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (name) DO UPDATE SET
                price = EXCLUDED.price,
                inventory = EXCLUDED.inventory,
                category_id = EXCLUDED.category_id,
                image = EXCLUDED.image,
                visible = EXCLUDED.visible,
                supplier = EXCLUDED.supplier,
                description = EXCLUDED.description,
                updated_at = now()
            RETURNING id
            ",
        )
        .bind(&product.name)
        .bind(product.price)
        .bind(quantity_to_db(product.inventory)?)
        .bind(category_id)
        .bind(&product.image)
        .bind(product.visible)
        .bind(&product.supplier)
        .bind(&product.description)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }
}
