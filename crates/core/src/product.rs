//! Catalog products and stock levels.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, ProductId};

/// A product as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unit price in major currency units.
    pub price: Decimal,
    /// Units on hand. Never negative once persisted.
    pub inventory: i32,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    /// Image file name, relative to the product image directory.
    pub image: Option<String>,
    pub visible: bool,
    pub supplier: Option<String>,
    pub description: Option<String>,
}

impl Product {
    /// Units that can currently be ordered.
    #[must_use]
    pub fn available(&self) -> u32 {
        u32::try_from(self.inventory).unwrap_or(0)
    }

    #[must_use]
    pub fn stock_level(&self, low_stock_threshold: u32) -> StockLevel {
        StockLevel::for_inventory(self.available(), low_stock_threshold)
    }

    fn has_category(&self) -> bool {
        self.category_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty())
    }
}

/// Stock badge shown next to a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    InStock,
    /// `0 < inventory <= threshold`.
    LowStock,
    OutOfStock,
}

impl StockLevel {
    #[must_use]
    pub const fn for_inventory(available: u32, low_stock_threshold: u32) -> Self {
        if available == 0 {
            Self::OutOfStock
        } else if available <= low_stock_threshold {
            Self::LowStock
        } else {
            Self::InStock
        }
    }
}

/// Which products a customer sees.
///
/// Hidden products and products without a category are never listed.
/// Out-of-stock products are listed only when `show_out_of_stock` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogFilter {
    /// Exact category name match.
    pub category: Option<String>,
    /// Case-insensitive substring match on the product name.
    pub search: Option<String>,
    #[serde(default)]
    pub show_out_of_stock: bool,
}

impl CatalogFilter {
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if !product.visible || !product.has_category() {
            return false;
        }
        if !self.show_out_of_stock && product.available() == 0 {
            return false;
        }
        if let Some(category) = non_blank(self.category.as_deref())
            && product.category_name.as_deref() != Some(category)
        {
            return false;
        }
        if let Some(search) = non_blank(self.search.as_deref()) {
            return product
                .name
                .to_lowercase()
                .contains(&search.to_lowercase());
        }
        true
    }

    /// Products passing the filter, in input order.
    #[must_use]
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }

    /// Sorted, de-duplicated category names of the listable products,
    /// ignoring this filter's own category and search terms.
    #[must_use]
    pub fn categories(&self, products: &[Product]) -> Vec<String> {
        let listable = Self {
            category: None,
            search: None,
            show_out_of_stock: self.show_out_of_stock,
        };
        let mut names: Vec<String> = products
            .iter()
            .filter(|p| listable.matches(p))
            .filter_map(|p| p.category_name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: i32, name: &str, category: Option<&str>, inventory: i32) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            price: Decimal::new(450, 2),
            inventory,
            category_id: category.map(|_| CategoryId::new(1)),
            category_name: category.map(str::to_string),
            image: None,
            visible: true,
            supplier: None,
            description: None,
        }
    }

    #[test]
    fn test_stock_levels() {
        assert_eq!(StockLevel::for_inventory(0, 10), StockLevel::OutOfStock);
        assert_eq!(StockLevel::for_inventory(1, 10), StockLevel::LowStock);
        assert_eq!(StockLevel::for_inventory(10, 10), StockLevel::LowStock);
        assert_eq!(StockLevel::for_inventory(11, 10), StockLevel::InStock);
        assert_eq!(
            product(1, "x", Some("Snacks"), -3).stock_level(10),
            StockLevel::OutOfStock
        );
    }

    #[test]
    fn test_default_filter_hides_unlistable() {
        let mut hidden = product(3, "Hidden", Some("Snacks"), 5);
        hidden.visible = false;
        let products = vec![
            product(1, "Chips", Some("Snacks"), 5),
            product(2, "Milk", Some("Dairy"), 0),
            hidden,
            product(4, "Mystery", None, 5),
            product(5, "Blank", Some("  "), 5),
        ];

        let listed: Vec<_> = CatalogFilter::default()
            .apply(&products)
            .into_iter()
            .map(|p| p.id.as_i32())
            .collect();
        assert_eq!(listed, vec![1]);

        let with_oos = CatalogFilter {
            show_out_of_stock: true,
            ..CatalogFilter::default()
        };
        assert_eq!(with_oos.apply(&products).len(), 2);
    }

    #[test]
    fn test_category_and_search() {
        let products = vec![
            product(1, "Salt & Vinegar Chips", Some("Snacks"), 5),
            product(2, "Chocolate Milk", Some("Dairy"), 5),
            product(3, "Chocolate Bar", Some("Snacks"), 5),
        ];

        let filter = CatalogFilter {
            category: Some("Snacks".into()),
            search: Some("CHOC".into()),
            ..CatalogFilter::default()
        };
        let ids: Vec<_> = filter.apply(&products).iter().map(|p| p.id.as_i32()).collect();
        assert_eq!(ids, vec![3]);

        let blank = CatalogFilter {
            category: Some(String::new()),
            search: Some("  ".into()),
            ..CatalogFilter::default()
        };
        assert_eq!(blank.apply(&products).len(), 3);
    }

    #[test]
    fn test_categories() {
        let products = vec![
            product(1, "A", Some("Snacks"), 5),
            product(2, "B", Some("Dairy"), 5),
            product(3, "C", Some("Snacks"), 5),
            product(4, "D", Some("Frozen"), 0),
        ];
        let filter = CatalogFilter {
            category: Some("Dairy".into()),
            ..CatalogFilter::default()
        };
        assert_eq!(filter.categories(&products), vec!["Dairy", "Snacks"]);
    }
}
