//! The `Shop` facade.

use chrono::{DateTime, Utc};

use stockroom_core::{CategoryId, OrderId, OrderStatus, Price, ProductId, TransitionPolicy, UserId};

use crate::config::ShopConfig;
use crate::db::{self, PgStore, Store};
use crate::error::ShopError;
use crate::models::{
    CartItem, CartView, Category, NewProduct, Order, OrderDetails, PlacedOrder, Product,
    ProductDetails, ProductFilter, Receipt, SalesSummary,
};
use crate::services::{CartManager, Catalog, Checkout, OrderLifecycle};

/// Entry point to every shop operation.
///
/// Owns a [`Store`] and the status transition policy. Each method opens its
/// own transaction; `Shop` holds no other state, so it can be shared behind
/// an `Arc` by concurrent callers.
#[derive(Debug, Clone)]
pub struct Shop<S> {
    store: S,
    policy: TransitionPolicy,
}

impl Shop<PgStore> {
    /// Connect to `PostgreSQL` using `config`.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Storage` if the pool cannot connect.
    pub async fn connect(config: &ShopConfig) -> Result<Self, ShopError> {
        let pool = db::create_pool(&config.database)
            .await
            .map_err(db::postgres::map_db_error)?;
        Ok(Self::new(PgStore::new(pool)).with_policy(config.status_policy))
    }
}

impl<S: Store> Shop<S> {
    /// A shop over `store` with the permissive transition policy.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            policy: TransitionPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    #[must_use]
    pub const fn catalog(&self) -> Catalog<'_, S> {
        Catalog::new(&self.store)
    }

    #[must_use]
    pub const fn carts(&self) -> CartManager<'_, S> {
        CartManager::new(&self.store)
    }

    #[must_use]
    pub const fn orders(&self) -> OrderLifecycle<'_, S> {
        OrderLifecycle::new(&self.store, self.policy)
    }

    // -------------------------------------------------------------------------
    // Cart
    // -------------------------------------------------------------------------

    /// See [`CartManager::add_to_cart`].
    ///
    /// # Errors
    ///
    /// `NotFound`, `OutOfStock`, `InsufficientStock` or `Storage`.
    pub async fn add_to_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartItem, ShopError> {
        self.carts().add_to_cart(user_id, product_id).await
    }

    /// See [`CartManager::increment`].
    ///
    /// # Errors
    ///
    /// `NotFound`, `OutOfStock`, `InsufficientStock` or `Storage`.
    pub async fn increment_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartItem, ShopError> {
        self.carts().increment(user_id, product_id).await
    }

    /// See [`CartManager::decrement`].
    ///
    /// # Errors
    ///
    /// `NotFound` or `Storage`.
    pub async fn decrement_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartItem, ShopError> {
        self.carts().decrement(user_id, product_id).await
    }

    /// See [`CartManager::remove`].
    ///
    /// # Errors
    ///
    /// `Storage` only.
    pub async fn remove_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, ShopError> {
        self.carts().remove(user_id, product_id).await
    }

    /// # Errors
    ///
    /// `Storage` only.
    pub async fn list_cart(&self, user_id: UserId) -> Result<CartView, ShopError> {
        self.carts().list(user_id).await
    }

    // -------------------------------------------------------------------------
    // Checkout and orders
    // -------------------------------------------------------------------------

    /// See [`Checkout::checkout`].
    ///
    /// # Errors
    ///
    /// `EmptyCart`, `InsufficientStock`, `NotFound`, `ConcurrencyConflict` or
    /// `Storage`.
    pub async fn checkout(&self, user_id: UserId) -> Result<Receipt, ShopError> {
        Checkout::new(&self.store).checkout(user_id).await
    }

    /// # Errors
    ///
    /// `NotFound`, `InvalidTransition` or `Storage`.
    pub async fn set_order_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, ShopError> {
        self.orders().set_status(order_id, status).await
    }

    /// # Errors
    ///
    /// `NotFound` or `Storage`.
    pub async fn get_order(&self, order_id: OrderId) -> Result<OrderDetails, ShopError> {
        self.orders().get(order_id).await
    }

    /// # Errors
    ///
    /// `Storage` only.
    pub async fn list_order_history(&self, user_id: UserId) -> Result<Vec<PlacedOrder>, ShopError> {
        self.orders().history(user_id).await
    }

    /// # Errors
    ///
    /// `Storage` only.
    pub async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, ShopError> {
        self.orders().list(status).await
    }

    /// # Errors
    ///
    /// `InvalidInput` or `Storage`.
    pub async fn sales_summary(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<SalesSummary, ShopError> {
        self.orders().sales_summary(from, to).await
    }

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// `Storage` only.
    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, ShopError> {
        self.catalog().list_products(filter).await
    }

    /// # Errors
    ///
    /// `NotFound` or `Storage`.
    pub async fn get_product(&self, product_id: ProductId) -> Result<Product, ShopError> {
        self.catalog().get_product(product_id).await
    }

    /// # Errors
    ///
    /// `InvalidInput`, `NotFound` or `Storage`.
    pub async fn create_product(&self, product: NewProduct) -> Result<Product, ShopError> {
        self.catalog().create_product(product).await
    }

    /// # Errors
    ///
    /// `NotFound` or `Storage`.
    pub async fn update_price(
        &self,
        product_id: ProductId,
        price: Price,
    ) -> Result<Product, ShopError> {
        self.catalog().update_price(product_id, price).await
    }

    /// See [`Catalog::update_product`].
    ///
    /// # Errors
    ///
    /// `InvalidInput`, `NotFound` or `Storage`.
    pub async fn update_product(
        &self,
        product_id: ProductId,
        details: ProductDetails,
    ) -> Result<Product, ShopError> {
        self.catalog().update_product(product_id, details).await
    }

    /// See [`Catalog::delete_product`].
    ///
    /// # Errors
    ///
    /// `InvalidInput` or `Storage`.
    pub async fn delete_product(&self, product_id: ProductId) -> Result<bool, ShopError> {
        self.catalog().delete_product(product_id).await
    }

    /// # Errors
    ///
    /// `InvalidInput`, `NotFound` or `Storage`.
    pub async fn restock(&self, product_id: ProductId, amount: i32) -> Result<Product, ShopError> {
        self.catalog().restock(product_id, amount).await
    }

    /// # Errors
    ///
    /// `InvalidInput` or `Storage`.
    pub async fn create_category(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Category, ShopError> {
        self.catalog().create_category(name, description).await
    }

    /// # Errors
    ///
    /// `Storage` only.
    pub async fn delete_category(&self, category_id: CategoryId) -> Result<bool, ShopError> {
        self.catalog().delete_category(category_id).await
    }

    /// # Errors
    ///
    /// `Storage` only.
    pub async fn list_categories(&self) -> Result<Vec<Category>, ShopError> {
        self.catalog().list_categories().await
    }

    /// # Errors
    ///
    /// `NotFound` or `Storage`.
    pub async fn get_category(&self, category_id: CategoryId) -> Result<Category, ShopError> {
        self.catalog().get_category(category_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::services::testing;

    #[tokio::test]
    async fn test_policy_flows_to_order_lifecycle() {
        let store = MemoryStore::new();
        let user = testing::user(&store, "alice").await;
        let product = testing::product(&store, "Widget", "1.00", 1).await;
        let shop = Shop::new(store).with_policy(TransitionPolicy::ForwardOnly);

        shop.add_to_cart(user, product).await.unwrap();
        let receipt = shop.checkout(user).await.unwrap();
        shop.set_order_status(receipt.order.id, OrderStatus::Completed)
            .await
            .unwrap();
        let err = shop
            .set_order_status(receipt.order.id, OrderStatus::Assembling)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_default_policy_is_permissive() {
        let shop = Shop::new(MemoryStore::new());
        assert_eq!(shop.policy(), TransitionPolicy::Permissive);
    }
}
