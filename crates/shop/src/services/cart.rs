//! Cart mutations.
//!
//! Each call reads the product's stock and writes the cart line inside one
//! store transaction. The line is locked before its quantity is read, so
//! concurrent changes to the same line apply one after another. The stock
//! check here is advisory; checkout re-checks under lock.

use tracing::{debug, info, instrument, warn};

use stockroom_core::{ProductId, UserId};

use crate::db::{Store, StoreTx};
use crate::error::{Entity, ShopError};
use crate::models::{CartItem, CartView, Product};

/// Reject adding one more unit of `product` to a line holding `quantity`.
fn ensure_room_for_one_more(product: &Product, quantity: i32) -> Result<(), ShopError> {
    if !product.in_stock() {
        warn!(product_id = %product.id, "Product is out of stock");
        return Err(ShopError::OutOfStock {
            product_id: product.id,
        });
    }
    if quantity >= product.stock_quantity {
        warn!(
            product_id = %product.id,
            quantity,
            stock = product.stock_quantity,
            "Cart line already holds all available stock"
        );
        return Err(ShopError::InsufficientStock {
            product_id: product.id,
            available: product.stock_quantity,
        });
    }
    Ok(())
}

/// Per-user cart operations.
pub struct CartManager<'a, S> {
    store: &'a S,
}

impl<'a, S: Store> CartManager<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Put one unit of `product_id` in the user's cart.
    ///
    /// Creates the line with quantity 1, or increments an existing line.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if the product does not exist.
    /// Returns `ShopError::OutOfStock` if the product has no stock.
    /// Returns `ShopError::InsufficientStock` if the line already holds all
    /// available units.
    #[instrument(skip_all, fields(user_id = %user_id, product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartItem, ShopError> {
        let mut tx = self.store.begin().await?;
        let product = tx
            .product(product_id)
            .await?
            .ok_or(ShopError::NotFound(Entity::Product(product_id)))?;

        let existing = match tx.lock_cart_item(user_id, product_id).await? {
            Some(existing) => existing,
            None => {
                ensure_room_for_one_more(&product, 0)?;
                if let Some(created) = tx.insert_cart_item(user_id, product_id, 1).await? {
                    tx.commit().await?;
                    info!(quantity = created.quantity, "Added to cart");
                    return Ok(created);
                }
                // Created by a concurrent add that has committed since.
                tx.lock_cart_item(user_id, product_id)
                    .await?
                    .ok_or(ShopError::ConcurrencyConflict)?
            }
        };
        ensure_room_for_one_more(&product, existing.quantity)?;
        let item = tx
            .set_cart_quantity(existing.id, existing.quantity + 1)
            .await?;
        tx.commit().await?;

        info!(quantity = item.quantity, "Added to cart");
        Ok(item)
    }

    /// Increase an existing line by one.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if there is no such line.
    /// Returns `ShopError::OutOfStock` or `ShopError::InsufficientStock` when
    /// the stock cannot cover one more unit.
    #[instrument(skip_all, fields(user_id = %user_id, product_id = %product_id))]
    pub async fn increment(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartItem, ShopError> {
        let mut tx = self.store.begin().await?;
        let existing = tx
            .lock_cart_item(user_id, product_id)
            .await?
            .ok_or(ShopError::NotFound(Entity::CartItem {
                user: user_id,
                product: product_id,
            }))?;
        let product = tx
            .product(product_id)
            .await?
            .ok_or(ShopError::NotFound(Entity::Product(product_id)))?;

        ensure_room_for_one_more(&product, existing.quantity)?;
        let item = tx
            .set_cart_quantity(existing.id, existing.quantity + 1)
            .await?;
        tx.commit().await?;

        info!(quantity = item.quantity, "Cart line incremented");
        Ok(item)
    }

    /// Decrease an existing line by one, never below 1.
    ///
    /// A line at quantity 1 is returned unchanged; use [`Self::remove`] to
    /// drop it.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if there is no such line.
    #[instrument(skip_all, fields(user_id = %user_id, product_id = %product_id))]
    pub async fn decrement(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartItem, ShopError> {
        let mut tx = self.store.begin().await?;
        let existing = tx
            .lock_cart_item(user_id, product_id)
            .await?
            .ok_or(ShopError::NotFound(Entity::CartItem {
                user: user_id,
                product: product_id,
            }))?;

        if existing.quantity <= 1 {
            debug!("Cart line already at minimum quantity");
            return Ok(existing);
        }

        let item = tx
            .set_cart_quantity(existing.id, existing.quantity - 1)
            .await?;
        tx.commit().await?;

        info!(quantity = item.quantity, "Cart line decremented");
        Ok(item)
    }

    /// Delete a line. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Storage` if the store fails.
    #[instrument(skip_all, fields(user_id = %user_id, product_id = %product_id))]
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<bool, ShopError> {
        let mut tx = self.store.begin().await?;
        let removed = tx.delete_cart_item(user_id, product_id).await?;
        tx.commit().await?;

        if removed {
            info!("Removed from cart");
        }
        Ok(removed)
    }

    /// The user's cart with current product names, prices and stock.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Storage` if the store fails.
    pub async fn list(&self, user_id: UserId) -> Result<CartView, ShopError> {
        let mut tx = self.store.begin().await?;
        let lines = tx.cart_lines(user_id).await?;
        Ok(CartView { user_id, lines })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::db::MemoryStore;
    use crate::services::testing;

    #[tokio::test]
    async fn test_add_creates_then_increments() {
        let store = MemoryStore::new();
        let user = testing::user(&store, "alice").await;
        let product = testing::product(&store, "Widget", "9.99", 3).await;
        let carts = CartManager::new(&store);

        assert_eq!(carts.add_to_cart(user, product).await.unwrap().quantity, 1);
        assert_eq!(carts.add_to_cart(user, product).await.unwrap().quantity, 2);

        let view = carts.list(user).await.unwrap();
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.total(), Some(Decimal::new(1998, 2)));
    }

    #[tokio::test]
    async fn test_add_stops_at_stock() {
        let store = MemoryStore::new();
        let user = testing::user(&store, "alice").await;
        let product = testing::product(&store, "Widget", "1.00", 2).await;
        let carts = CartManager::new(&store);

        carts.add_to_cart(user, product).await.unwrap();
        carts.add_to_cart(user, product).await.unwrap();
        let err = carts.add_to_cart(user, product).await.unwrap_err();
        assert!(matches!(
            err,
            ShopError::InsufficientStock { product_id, available: 2 } if product_id == product
        ));
        assert_eq!(carts.list(user).await.unwrap().lines[0].item.quantity, 2);
    }

    #[tokio::test]
    async fn test_add_out_of_stock() {
        let store = MemoryStore::new();
        let user = testing::user(&store, "alice").await;
        let product = testing::product(&store, "Widget", "1.00", 0).await;
        let carts = CartManager::new(&store);

        let err = carts.add_to_cart(user, product).await.unwrap_err();
        assert!(matches!(err, ShopError::OutOfStock { .. }));
        assert!(carts.list(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_missing_product() {
        let store = MemoryStore::new();
        let user = testing::user(&store, "alice").await;
        let carts = CartManager::new(&store);

        let err = carts
            .add_to_cart(user, ProductId::new(404))
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::NotFound(Entity::Product(_))));
    }

    #[tokio::test]
    async fn test_increment_and_decrement_need_a_line() {
        let store = MemoryStore::new();
        let user = testing::user(&store, "alice").await;
        let product = testing::product(&store, "Widget", "1.00", 5).await;
        let carts = CartManager::new(&store);

        let err = carts.increment(user, product).await.unwrap_err();
        assert!(matches!(err, ShopError::NotFound(Entity::CartItem { .. })));
        let err = carts.decrement(user, product).await.unwrap_err();
        assert!(matches!(err, ShopError::NotFound(Entity::CartItem { .. })));
    }

    #[tokio::test]
    async fn test_decrement_floors_at_one() {
        let store = MemoryStore::new();
        let user = testing::user(&store, "alice").await;
        let product = testing::product(&store, "Widget", "1.00", 5).await;
        let carts = CartManager::new(&store);

        carts.add_to_cart(user, product).await.unwrap();
        carts.increment(user, product).await.unwrap();
        assert_eq!(carts.decrement(user, product).await.unwrap().quantity, 1);
        assert_eq!(carts.decrement(user, product).await.unwrap().quantity, 1);
        assert_eq!(carts.list(user).await.unwrap().lines.len(), 1);
    }

    #[tokio::test]
    async fn test_increment_respects_stock_after_stock_drops() {
        let store = MemoryStore::new();
        let user = testing::user(&store, "alice").await;
        let product = testing::product(&store, "Widget", "1.00", 1).await;
        let carts = CartManager::new(&store);

        carts.add_to_cart(user, product).await.unwrap();
        let err = carts.increment(user, product).await.unwrap_err();
        assert!(matches!(err, ShopError::InsufficientStock { available: 1, .. }));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let store = MemoryStore::new();
        let user = testing::user(&store, "alice").await;
        let product = testing::product(&store, "Widget", "1.00", 5).await;
        let carts = CartManager::new(&store);

        carts.add_to_cart(user, product).await.unwrap();
        assert!(carts.remove(user, product).await.unwrap());
        assert!(!carts.remove(user, product).await.unwrap());
        assert!(carts.list(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_carts_are_per_user() {
        let store = MemoryStore::new();
        let alice = testing::user(&store, "alice").await;
        let bob = testing::user(&store, "bob").await;
        let product = testing::product(&store, "Widget", "1.00", 5).await;
        let carts = CartManager::new(&store);

        carts.add_to_cart(alice, product).await.unwrap();
        assert!(carts.list(bob).await.unwrap().is_empty());
        assert!(!carts.remove(bob, product).await.unwrap());
        assert_eq!(carts.list(alice).await.unwrap().lines.len(), 1);
    }
}
