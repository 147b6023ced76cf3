//! Persistence for the shop core.
//!
//! # Unit of work
//!
//! Services never talk to a connection directly. They receive a [`Store`] and
//! open a [`StoreTx`] per operation; everything read or written through that
//! transaction becomes visible atomically on [`StoreTx::commit`], and is
//! discarded if the transaction is dropped instead.
//!
//! Two stores are provided:
//!
//! - [`PgStore`] - `PostgreSQL` via sqlx. Rows that are read and then written
//!   back (products at checkout, cart lines, orders) are locked with
//!   `SELECT ... FOR UPDATE`; stock is decremented with a guarded update.
//! - [`MemoryStore`] - in-process tables behind a single async mutex, with
//!   fault injection for tests.
//!
//! ## Tables
//!
//! - `categories` - Catalog categories
//! - `users` - Purchaser identity (registration lives outside the core)
//! - `products` - Catalog with `stock_quantity >= 0`
//! - `cart_items` - One row per (user, product)
//! - `orders` / `order_items` - Immutable purchase records, status aside
//!
//! # Migrations
//!
//! Migrations are stored in `crates/shop/migrations/` and run via:
//! ```bash
//! cargo run -p stockroom-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::future::Future;

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use stockroom_core::{CartItemId, CategoryId, OrderId, OrderStatus, Price, ProductId, UserId};

use crate::config::DatabaseConfig;
use crate::models::{
    CartItem, CartLine, Category, NewOrder, NewOrderItem, NewProduct, Order, OrderItem, OrderLine,
    Product, ProductDetails, ProductFilter, Purchaser, SalesSummary,
};

pub use memory::{Fault, MemoryStore};
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (unique, foreign key, check).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The store aborted the transaction because of concurrent access.
    #[error("serialization failure: {0}")]
    Serialization(String),

    /// The store could not be reached or refused the write.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A transactional store.
pub trait Store: Send + Sync {
    /// Transaction handle. Dropping it without committing rolls back.
    type Tx: StoreTx;

    /// Open a transaction.
    fn begin(&self) -> impl Future<Output = Result<Self::Tx, RepositoryError>> + Send;
}

/// Operations available inside one store transaction.
///
/// Read methods see the transaction's own uncommitted writes.
pub trait StoreTx: Send {
    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    /// Read a product without locking it.
    fn product(
        &mut self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<Product>, RepositoryError>> + Send;

    /// Read and lock products until the transaction ends.
    ///
    /// Rows are locked in ascending id order. Missing ids are skipped.
    fn lock_products(
        &mut self,
        ids: &[ProductId],
    ) -> impl Future<Output = Result<Vec<Product>, RepositoryError>> + Send;

    /// Products matching `filter`, ordered by name then id.
    fn products(
        &mut self,
        filter: &ProductFilter,
    ) -> impl Future<Output = Result<Vec<Product>, RepositoryError>> + Send;

    fn insert_product(
        &mut self,
        product: &NewProduct,
    ) -> impl Future<Output = Result<Product, RepositoryError>> + Send;

    /// Overwrite a product's price. Returns `None` if it does not exist.
    fn set_price(
        &mut self,
        id: ProductId,
        price: Price,
    ) -> impl Future<Output = Result<Option<Product>, RepositoryError>> + Send;

    /// Overwrite name, description, image and category. Price and stock are
    /// left alone. Returns `None` if the product does not exist.
    fn update_product(
        &mut self,
        id: ProductId,
        details: &ProductDetails,
    ) -> impl Future<Output = Result<Option<Product>, RepositoryError>> + Send;

    /// Delete a product and the cart rows holding it.
    ///
    /// Fails with `Conflict` if any order item references it. Returns whether
    /// a row was deleted.
    fn delete_product(
        &mut self,
        id: ProductId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Increase stock. Returns `None` if the product does not exist.
    fn add_stock(
        &mut self,
        id: ProductId,
        amount: i32,
    ) -> impl Future<Output = Result<Option<Product>, RepositoryError>> + Send;

    /// Decrease stock by `quantity` only if at least that much is available.
    ///
    /// Returns `false` when the guard did not hold and nothing changed.
    fn take_stock(
        &mut self,
        id: ProductId,
        quantity: i32,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    fn category(
        &mut self,
        id: CategoryId,
    ) -> impl Future<Output = Result<Option<Category>, RepositoryError>> + Send;

    /// All categories ordered by name.
    fn categories(&mut self) -> impl Future<Output = Result<Vec<Category>, RepositoryError>> + Send;

    /// Insert a category. Fails with `Conflict` if the name is taken.
    fn insert_category(
        &mut self,
        name: &str,
        description: Option<&str>,
    ) -> impl Future<Output = Result<Category, RepositoryError>> + Send;

    /// Delete a category. Its products become uncategorized. Returns whether
    /// a row was deleted.
    fn delete_category(
        &mut self,
        id: CategoryId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    fn purchaser(
        &mut self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<Purchaser>, RepositoryError>> + Send;

    /// Insert a user. Fails with `Conflict` if the username is taken.
    fn insert_user(
        &mut self,
        username: &str,
        email: &str,
    ) -> impl Future<Output = Result<Purchaser, RepositoryError>> + Send;

    // -------------------------------------------------------------------------
    // Cart
    // -------------------------------------------------------------------------

    /// Read and lock one cart row until the transaction ends.
    fn lock_cart_item(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
    ) -> impl Future<Output = Result<Option<CartItem>, RepositoryError>> + Send;

    /// All of a user's cart rows, ascending product id.
    fn cart_items(
        &mut self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<CartItem>, RepositoryError>> + Send;

    /// Cart rows joined with product data, ascending product id.
    fn cart_lines(
        &mut self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<CartLine>, RepositoryError>> + Send;

    /// Insert a cart row unless the (user, product) pair already exists.
    ///
    /// Returns `None` when another transaction owns the pair. If that
    /// transaction is still open, the call waits for it to finish.
    fn insert_cart_item(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> impl Future<Output = Result<Option<CartItem>, RepositoryError>> + Send;

    /// Overwrite a cart row's quantity. Fails with `NotFound` if it is gone.
    fn set_cart_quantity(
        &mut self,
        id: CartItemId,
        quantity: i32,
    ) -> impl Future<Output = Result<CartItem, RepositoryError>> + Send;

    /// Delete one cart row. Returns whether a row was deleted.
    fn delete_cart_item(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Delete every cart row of a user. Returns the number deleted.
    fn clear_cart(
        &mut self,
        user_id: UserId,
    ) -> impl Future<Output = Result<u64, RepositoryError>> + Send;

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    fn insert_order(
        &mut self,
        order: &NewOrder,
    ) -> impl Future<Output = Result<Order, RepositoryError>> + Send;

    fn insert_order_item(
        &mut self,
        order_id: OrderId,
        item: &NewOrderItem,
    ) -> impl Future<Output = Result<OrderItem, RepositoryError>> + Send;

    fn order(
        &mut self,
        id: OrderId,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send;

    /// Read and lock an order row until the transaction ends.
    fn lock_order(
        &mut self,
        id: OrderId,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send;

    /// Items of an order with product names, ascending item id.
    fn order_lines(
        &mut self,
        order_id: OrderId,
    ) -> impl Future<Output = Result<Vec<OrderLine>, RepositoryError>> + Send;

    /// A user's orders, most recent first.
    fn orders_for_user(
        &mut self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<Order>, RepositoryError>> + Send;

    /// All orders, most recent first, optionally limited to one status.
    fn orders(
        &mut self,
        status: Option<OrderStatus>,
    ) -> impl Future<Output = Result<Vec<Order>, RepositoryError>> + Send;

    /// Overwrite an order's status. Returns `None` if it does not exist.
    fn set_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send;

    /// Count and revenue of orders placed in `[from, to)`.
    fn sales_summary(
        &mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> impl Future<Output = Result<SalesSummary, RepositoryError>> + Send;

    /// Make every write of this transaction visible.
    fn commit(self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Create a `PostgreSQL` connection pool.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(config.url.expose_secret())
        .await
}
