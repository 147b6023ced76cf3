//! CLI command implementations.
//!
//! Every command prints its result to stdout as pretty JSON.

pub mod cart;
pub mod catalog;
pub mod migrate;
pub mod orders;
pub mod seed;

use serde::Serialize;
use stockroom_shop::{PgStore, Shop};
use thiserror::Error;

/// Shop backed by `PostgreSQL`, as used by every command.
pub type PgShop = Shop<PgStore>;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Errors raised by the CLI itself, before reaching the shop.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Invalid date range: {0}")]
    InvalidRange(String),
}

/// Print `value` as pretty JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> CommandResult {
    let json = serde_json::to_string_pretty(value)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{json}");
    }
    Ok(())
}
