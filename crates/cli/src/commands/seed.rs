//! Seed the product catalog from a YAML file.
//!
//! ```yaml
//! products:
//!   - name: Salt & Vinegar Chips
//!     price: "4.50"
//!     inventory: 24
//!     category: Snacks
//!     image: chips-salt-vinegar.webp
//! ```
//!
//! Products are matched by name, so re-running a seed updates prices and
//! stock in place.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use nightowl_storefront::db::{self, NewProduct, ProductRepository};

use super::database_url;

#[derive(Debug, Deserialize)]
struct SeedFile {
    products: Vec<NewProduct>,
}

/// Problems that would make a product unusable in the storefront.
fn validate(products: &[NewProduct]) -> Vec<String> {
    let mut errors = Vec::new();
    for (i, product) in products.iter().enumerate() {
        let label = if product.name.trim().is_empty() {
            format!("product #{}", i + 1)
        } else {
            product.name.clone()
        };
        if product.name.trim().is_empty() {
            errors.push(format!("{label}: name is required"));
        }
        if product.price.is_sign_negative() || product.price.is_zero() {
            errors.push(format!("{label}: price must be positive"));
        }
        if product.category.as_deref().is_none_or(|c| c.trim().is_empty()) {
            errors.push(format!("{label}: no category, it will not be listed"));
        }
    }
    errors
}

/// Insert or update every product in `path`.
///
/// # Errors
///
/// Returns an error if the file is unreadable or invalid, or a database
/// operation fails.
pub async fn products(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("File not found: {}", path.display()).into());
    }

    info!(path = %path.display(), "Loading products from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;

    let errors = validate(&seed.products);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = db::create_pool(&database_url()?).await?;
    info!("Connected to database");

    let repo = ProductRepository::new(&pool);
    for product in &seed.products {
        let id = repo.upsert(product).await?;
        info!(id = %id, name = %product.name, inventory = product.inventory, "Seeded product");
    }

    info!(count = seed.products.len(), "Seeding complete");
    Ok(())
}
