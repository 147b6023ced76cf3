//! Cart to order conversion.
//!
//! A checkout runs in one store transaction:
//!
//! 1. Read the user's cart lines (ascending product id).
//! 2. Lock every referenced product row and check stock for each line.
//! 3. Insert the order and its items, priced from the locked rows.
//! 4. Decrement stock with a guarded update and clear the cart.
//! 5. Commit.
//!
//! Any error drops the transaction, leaving stock, cart and orders as they
//! were. A lost race on the guarded decrement, or a serialization failure
//! reported by the store, retries the whole transaction once.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use stockroom_core::{OrderStatus, Price, ProductId, UserId};

use crate::db::{Store, StoreTx};
use crate::error::{Entity, ShopError};
use crate::models::{NewOrder, NewOrderItem, Product, Receipt};

/// Attempts per checkout, including the first.
const MAX_ATTEMPTS: u32 = 2;

/// Checkout service.
pub struct Checkout<'a, S> {
    store: &'a S,
}

impl<'a, S: Store> Checkout<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Turn the user's cart into an order.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::EmptyCart` if the user has no cart lines.
    /// Returns `ShopError::InsufficientStock` for the first line (by product
    /// id) whose quantity exceeds current stock.
    /// Returns `ShopError::NotFound` if a carted product no longer exists.
    /// Returns `ShopError::InvalidInput` if the order total does not fit the
    /// `total_amount` column.
    /// Returns `ShopError::ConcurrencyConflict` if the retry also conflicted.
    /// Returns `ShopError::Storage` if the store fails.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn checkout(&self, user_id: UserId) -> Result<Receipt, ShopError> {
        let mut attempt = 1;
        loop {
            match self.try_checkout(user_id).await {
                Err(ShopError::ConcurrencyConflict) if attempt < MAX_ATTEMPTS => {
                    warn!(attempt, "Checkout conflicted with a concurrent update, retrying");
                    attempt += 1;
                }
                result => {
                    if let Err(ShopError::Storage(ref e)) = result {
                        error!(error = %e, "Checkout failed, transaction rolled back");
                    }
                    return result;
                }
            }
        }
    }

    async fn try_checkout(&self, user_id: UserId) -> Result<Receipt, ShopError> {
        let mut tx = self.store.begin().await?;

        let items = tx.cart_items(user_id).await?;
        if items.is_empty() {
            warn!("Checkout of an empty cart");
            return Err(ShopError::EmptyCart { user_id });
        }

        let ids: Vec<ProductId> = items.iter().map(|i| i.product_id).collect();
        let products: BTreeMap<ProductId, Product> = tx
            .lock_products(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut lines = Vec::with_capacity(items.len());
        for item in &items {
            let product = products
                .get(&item.product_id)
                .ok_or(ShopError::NotFound(Entity::Product(item.product_id)))?;
            if product.stock_quantity < item.quantity {
                warn!(
                    product_id = %product.id,
                    requested = item.quantity,
                    available = product.stock_quantity,
                    "Insufficient stock at checkout"
                );
                return Err(ShopError::InsufficientStock {
                    product_id: product.id,
                    available: product.stock_quantity,
                });
            }
            lines.push(NewOrderItem {
                product_id: product.id,
                quantity: item.quantity,
                unit_price: product.price,
            });
        }

        let total_amount = NewOrderItem::total(&lines)
            .filter(|total| *total <= Price::MAX.amount())
            .ok_or_else(|| {
                warn!("Order total exceeds the largest storable amount");
                ShopError::InvalidInput(format!(
                    "order total exceeds the largest storable amount {}",
                    Price::MAX
                ))
            })?;
        let order = tx
            .insert_order(&NewOrder {
                user_id,
                order_date: Utc::now(),
                status: OrderStatus::New,
                total_amount,
            })
            .await?;

        let mut order_items = Vec::with_capacity(lines.len());
        for line in &lines {
            order_items.push(tx.insert_order_item(order.id, line).await?);
            if !tx.take_stock(line.product_id, line.quantity).await? {
                return Err(ShopError::ConcurrencyConflict);
            }
        }

        tx.clear_cart(user_id).await?;
        tx.commit().await?;

        info!(
            order_id = %order.id,
            total = %order.total_amount,
            lines = order_items.len(),
            "Order placed"
        );
        Ok(Receipt {
            order,
            items: order_items,
        })
    }
}
