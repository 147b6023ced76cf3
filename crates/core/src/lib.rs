//! Stockroom Core - Shared domain types.
//!
//! This crate provides the types shared by every Stockroom component:
//! - `shop` - Catalog, cart, checkout and order lifecycle services
//! - `cli` - Command-line access to the shop core, migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access.
//! Enable the `postgres` feature to get `sqlx` encode/decode support.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices and order statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
