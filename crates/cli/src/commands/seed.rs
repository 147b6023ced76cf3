//! Seed an empty database with demo data.
//!
//! Inserts categories, two users (`admin` and `user`) and a handful of
//! products. Does nothing if any category already exists.

use serde_json::json;
use tracing::info;

use stockroom_shop::models::NewProduct;
use stockroom_shop::{Store, StoreTx};

use super::{CommandResult, PgShop, print_json};

const CATEGORIES: &[(&str, &str)] = &[
    ("Smartphones", "Mobile phones and smartphones"),
    ("Laptops", "Portable computers"),
    ("Tablets", "Tablet computers"),
    ("Computers", "Desktop computers and all-in-ones"),
    ("Accessories", "Accessories for electronics"),
];

const USERS: &[(&str, &str)] = &[("admin", "admin@example.com"), ("user", "user@example.com")];

/// (category, name, description, price, stock)
const PRODUCTS: &[(&str, &str, &str, &str, i32)] = &[
    ("Smartphones", "Pixel 9", "6.3\" OLED, 128 GB", "699.00", 12),
    ("Smartphones", "Galaxy S25", "6.2\" AMOLED, 256 GB", "799.99", 8),
    ("Laptops", "ThinkPad X1 Carbon", "14\" business ultrabook", "1499.00", 5),
    ("Tablets", "iPad Air", "11\" M2, 128 GB", "599.00", 7),
    ("Computers", "Mac mini", "M4, 16 GB, 512 GB", "799.00", 3),
    ("Accessories", "USB-C charger 65W", "GaN wall charger", "39.90", 40),
];

/// Insert demo data.
///
/// # Errors
///
/// Returns an error if any insert fails.
pub async fn run(shop: &PgShop) -> CommandResult {
    if !shop.list_categories().await?.is_empty() {
        info!("Database already seeded, skipping");
        return Ok(());
    }

    let mut categories = Vec::with_capacity(CATEGORIES.len());
    for (name, description) in CATEGORIES {
        categories.push(shop.create_category(name, Some(*description)).await?);
    }
    info!(count = categories.len(), "Seeded categories");

    let mut tx = shop.store().begin().await?;
    let mut users = Vec::with_capacity(USERS.len());
    for (username, email) in USERS {
        users.push(tx.insert_user(username, email).await?);
    }
    tx.commit().await?;
    info!(count = users.len(), "Seeded users");

    let mut products = Vec::with_capacity(PRODUCTS.len());
    for (category, name, description, price, stock) in PRODUCTS {
        let category_id = categories
            .iter()
            .find(|c| c.name == *category)
            .map(|c| c.id);
        let product = shop
            .create_product(NewProduct {
                name: (*name).to_owned(),
                description: Some((*description).to_owned()),
                price: price.parse()?,
                image_url: None,
                category_id,
                stock_quantity: *stock,
            })
            .await?;
        products.push(product);
    }
    info!(count = products.len(), "Seeded products");

    print_json(&json!({
        "categories": categories,
        "users": users,
        "products": products,
    }))
}
