//! Product and category commands.

use serde_json::json;

use stockroom_core::{CategoryId, Price, ProductId};
use stockroom_shop::models::{NewProduct, Product, ProductDetails, ProductFilter};

use super::{CommandResult, PgShop, print_json};

/// Arguments of `stockroom product add`.
pub struct ProductInput {
    pub name: String,
    pub price: Price,
    pub stock: i32,
    pub category: Option<CategoryId>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Arguments of `stockroom product edit`. `None` keeps the current value.
pub struct ProductEdit {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<Option<CategoryId>>,
}

impl ProductEdit {
    /// Details of `current` with the given fields replaced.
    fn apply(self, current: Product) -> ProductDetails {
        ProductDetails {
            name: self.name.unwrap_or(current.name),
            description: self.description.or(current.description),
            image_url: self.image_url.or(current.image_url),
            category_id: self.category.unwrap_or(current.category_id),
        }
    }
}

pub async fn list_products(
    shop: &PgShop,
    category_id: Option<CategoryId>,
    search: Option<String>,
) -> CommandResult {
    let filter = ProductFilter {
        category_id,
        search,
    };
    print_json(&shop.list_products(&filter).await?)
}

pub async fn show_product(shop: &PgShop, id: ProductId) -> CommandResult {
    print_json(&shop.get_product(id).await?)
}

pub async fn add_product(shop: &PgShop, input: ProductInput) -> CommandResult {
    let product = shop
        .create_product(NewProduct {
            name: input.name,
            description: input.description,
            price: input.price,
            image_url: input.image_url,
            category_id: input.category,
            stock_quantity: input.stock,
        })
        .await?;
    print_json(&product)
}

pub async fn edit_product(shop: &PgShop, id: ProductId, edit: ProductEdit) -> CommandResult {
    let current = shop.get_product(id).await?;
    print_json(&shop.update_product(id, edit.apply(current)).await?)
}

pub async fn delete_product(shop: &PgShop, id: ProductId) -> CommandResult {
    let deleted = shop.delete_product(id).await?;
    print_json(&json!({ "product_id": id, "deleted": deleted }))
}

pub async fn set_price(shop: &PgShop, id: ProductId, price: Price) -> CommandResult {
    print_json(&shop.update_price(id, price).await?)
}

pub async fn restock(shop: &PgShop, id: ProductId, amount: i32) -> CommandResult {
    print_json(&shop.restock(id, amount).await?)
}

pub async fn list_categories(shop: &PgShop) -> CommandResult {
    print_json(&shop.list_categories().await?)
}

pub async fn add_category(shop: &PgShop, name: &str, description: Option<&str>) -> CommandResult {
    print_json(&shop.create_category(name, description).await?)
}

pub async fn delete_category(shop: &PgShop, id: CategoryId) -> CommandResult {
    let deleted = shop.delete_category(id).await?;
    print_json(&json!({ "category_id": id, "deleted": deleted }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn current() -> Product {
        Product {
            id: ProductId::new(1),
            name: "Pixel".to_owned(),
            description: Some("Phone".to_owned()),
            price: "499.00".parse().unwrap(),
            image_url: None,
            category_id: Some(CategoryId::new(3)),
            stock_quantity: 4,
        }
    }

    #[test]
    fn test_edit_keeps_unset_fields() {
        let edit = ProductEdit {
            name: Some("Pixel 9".to_owned()),
            description: None,
            image_url: Some("https://img.example/p9.png".to_owned()),
            category: None,
        };
        let details = edit.apply(current());
        assert_eq!(details.name, "Pixel 9");
        assert_eq!(details.description.as_deref(), Some("Phone"));
        assert_eq!(details.image_url.as_deref(), Some("https://img.example/p9.png"));
        assert_eq!(details.category_id, Some(CategoryId::new(3)));
    }

    #[test]
    fn test_edit_can_uncategorize() {
        let edit = ProductEdit {
            name: None,
            description: None,
            image_url: None,
            category: Some(None),
        };
        assert_eq!(edit.apply(current()).category_id, None);
    }
}
