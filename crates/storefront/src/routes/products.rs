//! Product catalog route handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use nightowl_core::{CatalogFilter, Product, ProductId, StockLevel};

use crate::error::Result;
use crate::state::AppState;

/// Query parameters for the catalog.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
    /// Name search.
    pub q: Option<String>,
}

/// Product display data.
#[derive(Debug, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub category: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub available: u32,
    pub stock: StockLevel,
}

impl ProductView {
    fn new(product: &Product, low_stock_threshold: u32) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            category: product.category_name.clone(),
            image: product.image.clone(),
            description: product.description.clone(),
            available: product.available(),
            stock: product.stock_level(low_stock_threshold),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub products: Vec<ProductView>,
    /// Categories that have listable products.
    pub categories: Vec<String>,
}

/// Listable products, optionally filtered.
///
/// GET /api/products?category=Snacks&q=chip
///
/// # Errors
///
/// Returns `AppError::Database` if the catalog cannot be loaded.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<CatalogResponse>> {
    let settings = state.settings();
    let products = state.catalog().products().await?;

    let filter = CatalogFilter {
        category: query.category,
        search: query.q,
        show_out_of_stock: settings.show_out_of_stock,
    };

    Ok(Json(CatalogResponse {
        products: filter
            .apply(&products)
            .into_iter()
            .map(|p| ProductView::new(p, settings.low_stock_threshold))
            .collect(),
        categories: filter.categories(&products),
    }))
}
