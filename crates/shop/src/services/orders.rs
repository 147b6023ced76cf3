//! Order lifecycle: status changes, history and operator views.

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use stockroom_core::{OrderId, OrderStatus, TransitionPolicy, UserId};

use crate::db::{RepositoryError, Store, StoreTx};
use crate::error::{Entity, ShopError};
use crate::models::{Order, OrderDetails, PlacedOrder, SalesSummary};

/// Order lifecycle operations.
pub struct OrderLifecycle<'a, S> {
    store: &'a S,
    policy: TransitionPolicy,
}

impl<'a, S: Store> OrderLifecycle<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S, policy: TransitionPolicy) -> Self {
        Self { store, policy }
    }

    /// Move an order to `status`.
    ///
    /// The order row stays locked from the policy check to the write, so
    /// concurrent changes are applied one after another.
    /// Stock and carts are not touched.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if the order does not exist.
    /// Returns `ShopError::InvalidTransition` if the policy rejects the move.
    #[instrument(skip_all, fields(order_id = %order_id, status = %status))]
    pub async fn set_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, ShopError> {
        let mut tx = self.store.begin().await?;
        let current = tx
            .lock_order(order_id)
            .await?
            .ok_or(ShopError::NotFound(Entity::Order(order_id)))?;

        if !current.status.can_transition_to(status, self.policy) {
            warn!(from = %current.status, policy = %self.policy, "Status change rejected");
            return Err(ShopError::InvalidTransition {
                from: current.status,
                to: status,
            });
        }

        let order = tx
            .set_order_status(order_id, status)
            .await?
            .ok_or(ShopError::NotFound(Entity::Order(order_id)))?;
        tx.commit().await?;

        info!(from = %current.status, "Order status changed");
        Ok(order)
    }

    /// All of a user's orders with their lines, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Storage` if the store fails.
    pub async fn history(&self, user_id: UserId) -> Result<Vec<PlacedOrder>, ShopError> {
        let mut tx = self.store.begin().await?;
        let orders = tx.orders_for_user(user_id).await?;

        let mut placed = Vec::with_capacity(orders.len());
        for order in orders {
            let lines = tx.order_lines(order.id).await?;
            placed.push(PlacedOrder { order, lines });
        }
        Ok(placed)
    }

    /// One order with its lines and the purchaser's identity.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if the order does not exist.
    pub async fn get(&self, order_id: OrderId) -> Result<OrderDetails, ShopError> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .order(order_id)
            .await?
            .ok_or(ShopError::NotFound(Entity::Order(order_id)))?;
        let lines = tx.order_lines(order_id).await?;
        let purchaser = tx.purchaser(order.user_id).await?.ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "order {order_id} references missing user {}",
                order.user_id
            ))
        })?;

        Ok(OrderDetails {
            order,
            lines,
            purchaser,
        })
    }

    /// Every order, most recent first, optionally only those in `status`.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Storage` if the store fails.
    pub async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, ShopError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.orders(status).await?)
    }

    /// Order count and revenue for orders placed in `[from, to)`.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::InvalidInput` if `from` is after `to`.
    pub async fn sales_summary(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<SalesSummary, ShopError> {
        if from > to {
            return Err(ShopError::InvalidInput(format!(
                "summary range starts after it ends ({from} > {to})"
            )));
        }
        let mut tx = self.store.begin().await?;
        Ok(tx.sales_summary(from, to).await?)
    }
}
