//! Business operations over a [`Store`](crate::db::Store).
//!
//! # Services
//!
//! - `catalog` - Product browsing and catalog administration
//! - `cart` - Per-user cart mutations with stock checks
//! - `checkout` - All-or-nothing conversion of a cart into an order
//! - `orders` - Order status changes, history and operator views
//!
//! Every mutating operation opens its own store transaction and commits it
//! before returning.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;

pub use cart::CartManager;
pub use catalog::Catalog;
pub use checkout::Checkout;
pub use orders::OrderLifecycle;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod testing {
    use stockroom_core::{ProductId, UserId};

    use crate::db::{MemoryStore, Store, StoreTx};
    use crate::models::NewProduct;

    pub async fn user(store: &MemoryStore, username: &str) -> UserId {
        let mut tx = store.begin().await.unwrap();
        let user = tx
            .insert_user(username, &format!("{username}@example.com"))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        user.id
    }

    pub async fn product(store: &MemoryStore, name: &str, price: &str, stock: i32) -> ProductId {
        let mut tx = store.begin().await.unwrap();
        let product = tx
            .insert_product(&NewProduct {
                name: name.to_owned(),
                description: None,
                price: price.parse().unwrap(),
                image_url: None,
                category_id: None,
                stock_quantity: stock,
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();
        product.id
    }

    pub async fn stock(store: &MemoryStore, id: ProductId) -> i32 {
        let mut tx = store.begin().await.unwrap();
        tx.product(id).await.unwrap().unwrap().stock_quantity
    }
}
