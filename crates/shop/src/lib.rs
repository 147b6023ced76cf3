//! Stockroom Shop - inventory-consistent cart, checkout and order lifecycle.
//!
//! Users fill per-user carts from a stock-tracked catalog and check out. A
//! checkout either converts the whole cart into an order, decrementing stock
//! for every line, or changes nothing. Stock never goes negative, even when
//! many users check out the same products at once.
//!
//! # Usage
//!
//! ```rust,ignore
//! use stockroom_shop::{Shop, ShopConfig};
//!
//! let config = ShopConfig::from_env()?;
//! let shop = Shop::connect(&config).await?;
//!
//! shop.add_to_cart(user_id, product_id).await?;
//! let receipt = shop.checkout(user_id).await?;
//! ```
//!
//! # Modules
//!
//! - [`config`] - Environment configuration
//! - [`db`] - Store seam with `PostgreSQL` and in-memory implementations
//! - [`error`] - [`ShopError`] returned by every operation
//! - [`models`] - Products, carts, orders
//! - [`services`] - Catalog, cart, checkout and order lifecycle logic

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
mod shop;

pub use config::{ConfigError, LogFormat, ShopConfig};
pub use db::{Fault, MemoryStore, PgStore, RepositoryError, Store, StoreTx};
pub use error::{Entity, ShopError};
pub use shop::Shop;
