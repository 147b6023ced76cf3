//! Cart lines.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_core::{CartItemId, Price, ProductId, UserId};

/// One (user, product) pairing with a desired quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    /// Always at least 1.
    pub quantity: i32,
}

/// A cart line joined with the product's current name, price and stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub item: CartItem,
    pub product_name: String,
    pub price: Price,
    pub stock_quantity: i32,
}

impl CartLine {
    /// Current price times quantity, `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.price.line_total(self.item.quantity)
    }

    /// Whether the desired quantity still fits the current stock.
    ///
    /// Advisory only: stock is re-checked under lock at checkout.
    #[must_use]
    pub const fn fits_stock(&self) -> bool {
        self.item.quantity <= self.stock_quantity
    }
}

/// Read-only projection of a user's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartView {
    pub user_id: UserId,
    pub lines: Vec<CartLine>,
}

impl CartView {
    /// Sum of line totals at current prices, `None` on overflow.
    #[must_use]
    pub fn total(&self) -> Option<Decimal> {
        self.lines
            .iter()
            .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line.line_total()?))
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn unit_count(&self) -> i64 {
        self.lines.iter().map(|l| i64::from(l.item.quantity)).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
