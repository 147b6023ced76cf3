//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! stockroom migrate
//! ```
//!
//! Migrations live in `crates/shop/migrations/` and are embedded at build time.

use tracing::info;

use stockroom_shop::db::postgres::run_migrations;

use super::{CommandResult, PgShop};

/// Apply all pending shop migrations.
///
/// # Errors
///
/// Returns an error if a migration fails to apply.
pub async fn run(shop: &PgShop) -> CommandResult {
    info!("Running shop migrations...");
    run_migrations(shop.store().pool()).await?;
    info!("Shop migrations complete");
    Ok(())
}
