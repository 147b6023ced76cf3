//! Catalog products and categories.

use serde::{Deserialize, Serialize};

use stockroom_core::{CategoryId, Price, ProductId};

/// A sellable product with its stock counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Optional long description.
    pub description: Option<String>,
    /// Current unit price.
    pub price: Price,
    /// Optional image location, opaque to the core.
    pub image_url: Option<String>,
    /// Category, if assigned.
    pub category_id: Option<CategoryId>,
    /// Units available for purchase. Never negative.
    pub stock_quantity: i32,
}

impl Product {
    /// Returns `true` if at least one unit can be bought.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }
}

/// Parameters for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub image_url: Option<String>,
    pub category_id: Option<CategoryId>,
    pub stock_quantity: i32,
}

/// Editable product details. Price and stock have their own operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetails {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub category_id: Option<CategoryId>,
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
}

/// Catalog browsing filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductFilter {
    /// Only products in this category.
    pub category_id: Option<CategoryId>,
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
}

impl ProductFilter {
    /// Whether `product` passes this filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category_id) = self.category_id
            && product.category_id != Some(category_id)
        {
            return false;
        }
        match self.search_term() {
            Some(term) => product.name.to_lowercase().contains(&term),
            None => true,
        }
    }

    /// Normalized search term, `None` when blank.
    #[must_use]
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(name: &str, category: Option<i32>) -> Product {
        Product {
            id: ProductId::new(1),
            name: name.to_owned(),
            description: None,
            price: "10".parse().unwrap(),
            image_url: None,
            category_id: category.map(CategoryId::new),
            stock_quantity: 3,
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(ProductFilter::default().matches(&product("Laptop", None)));
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let filter = ProductFilter {
            search: Some("  LAP ".to_owned()),
            ..ProductFilter::default()
        };
        assert!(filter.matches(&product("Gaming laptop", None)));
        assert!(!filter.matches(&product("Phone", None)));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let filter = ProductFilter {
            search: Some("   ".to_owned()),
            ..ProductFilter::default()
        };
        assert_eq!(filter.search_term(), None);
        assert!(filter.matches(&product("Phone", None)));
    }

    #[test]
    fn test_category_filter() {
        let filter = ProductFilter {
            category_id: Some(CategoryId::new(2)),
            search: None,
        };
        assert!(filter.matches(&product("Tablet", Some(2))));
        assert!(!filter.matches(&product("Tablet", Some(3))));
        assert!(!filter.matches(&product("Tablet", None)));
    }
}
