//! Integration tests for Stockroom.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory store only
//! cargo test -p stockroom-integration-tests
//!
//! # Also run the PostgreSQL scenarios against a scratch database
//! STOCKROOM_TEST_DATABASE_URL=postgres://localhost/stockroom_test \
//!     cargo test -p stockroom-integration-tests
//! ```
//!
//! Fixtures here write straight through a [`Store`] transaction, since users
//! are owned outside the shop.

#![cfg_attr(not(test), forbid(unsafe_code))]

use chrono::Utc;

use stockroom_core::{ProductId, UserId};
use stockroom_shop::models::NewProduct;
use stockroom_shop::{RepositoryError, Shop, ShopConfig, ShopError, Store, StoreTx};

/// Environment variable holding the scratch database URL.
pub const TEST_DATABASE_URL: &str = "STOCKROOM_TEST_DATABASE_URL";

/// Name with a suffix that differs between runs, for tables with unique names.
#[must_use]
pub fn unique(prefix: &str) -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{prefix}-{nanos}")
}

/// Insert a user named `username`.
///
/// # Errors
///
/// Returns the store error if the insert fails.
pub async fn seed_user<S: Store>(store: &S, username: &str) -> Result<UserId, RepositoryError> {
    let mut tx = store.begin().await?;
    let user = tx
        .insert_user(username, &format!("{username}@example.com"))
        .await?;
    tx.commit().await?;
    Ok(user.id)
}

/// Insert an uncategorized product.
///
/// # Errors
///
/// Returns the store error if the insert fails.
pub async fn seed_product<S: Store>(
    store: &S,
    name: &str,
    price: &str,
    stock: i32,
) -> Result<ProductId, ShopError> {
    let price = price
        .parse()
        .map_err(|e| ShopError::InvalidInput(format!("{e}")))?;
    let mut tx = store.begin().await?;
    let product = tx
        .insert_product(&NewProduct {
            name: name.to_owned(),
            description: None,
            price,
            image_url: None,
            category_id: None,
            stock_quantity: stock,
        })
        .await?;
    tx.commit().await?;
    Ok(product.id)
}

/// Current stock of `product_id`.
///
/// # Errors
///
/// Returns `ShopError::NotFound` if the product is gone.
pub async fn stock_of<S: Store>(shop: &Shop<S>, product_id: ProductId) -> Result<i32, ShopError> {
    Ok(shop.get_product(product_id).await?.stock_quantity)
}

/// Put `quantity` units of `product_id` into the cart of `user_id`.
///
/// # Errors
///
/// Returns the first cart error.
pub async fn fill_cart<S: Store>(
    shop: &Shop<S>,
    user_id: UserId,
    product_id: ProductId,
    quantity: i32,
) -> Result<(), ShopError> {
    shop.add_to_cart(user_id, product_id).await?;
    for _ in 1..quantity {
        shop.increment_cart_item(user_id, product_id).await?;
    }
    Ok(())
}

/// Shop config pointing at the scratch database, if one is configured.
#[must_use]
pub fn test_database_config() -> Option<ShopConfig> {
    let url = std::env::var(TEST_DATABASE_URL).ok()?;
    ShopConfig::from_lookup(|key| (key == "STOCKROOM_DATABASE_URL").then(|| url.clone())).ok()
}
