//! Errors returned by shop operations.

use std::fmt;

use thiserror::Error;

use stockroom_core::{CategoryId, OrderId, OrderStatus, ProductId, UserId};

use crate::db::RepositoryError;

/// The entity an operation could not find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Product(ProductId),
    CartItem { user: UserId, product: ProductId },
    Order(OrderId),
    Category(CategoryId),
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Product(id) => write!(f, "product {id}"),
            Self::CartItem { user, product } => {
                write!(f, "cart item for user {user} and product {product}")
            }
            Self::Order(id) => write!(f, "order {id}"),
            Self::Category(id) => write!(f, "category {id}"),
        }
    }
}

/// Error type for every shop operation.
#[derive(Debug, Error)]
pub enum ShopError {
    #[error("{0} not found")]
    NotFound(Entity),

    /// The product has no stock at all.
    #[error("product {product_id} is out of stock")]
    OutOfStock { product_id: ProductId },

    /// The requested quantity exceeds what is available.
    #[error("insufficient stock for product {product_id}: {available} available")]
    InsufficientStock { product_id: ProductId, available: i32 },

    #[error("cart of user {user_id} is empty")]
    EmptyCart { user_id: UserId },

    /// Another transaction changed the same rows. Safe to retry.
    #[error("concurrent update conflict, try again")]
    ConcurrencyConflict,

    /// The configured transition policy rejects this status change.
    #[error("order status cannot change from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Storage(RepositoryError),
}

impl ShopError {
    /// Whether repeating the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrencyConflict
                | Self::Storage(
                    RepositoryError::Unavailable(_)
                        | RepositoryError::Serialization(_)
                        | RepositoryError::Database(_)
                )
        )
    }
}

impl From<RepositoryError> for ShopError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Serialization(_) => Self::ConcurrencyConflict,
            other => Self::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ShopError::NotFound(Entity::CartItem {
            user: UserId::new(1),
            product: ProductId::new(7),
        });
        assert_eq!(
            err.to_string(),
            "cart item for user 1 and product 7 not found"
        );

        let err = ShopError::InsufficientStock {
            product_id: ProductId::new(3),
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock for product 3: 2 available"
        );

        let err = ShopError::InvalidTransition {
            from: OrderStatus::Completed,
            to: OrderStatus::New,
        };
        assert_eq!(err.to_string(), "order status cannot change from completed to new");
    }

    #[test]
    fn test_serialization_failure_becomes_conflict() {
        let err = ShopError::from(RepositoryError::Serialization("40001".to_owned()));
        assert!(matches!(err, ShopError::ConcurrencyConflict));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_retryable() {
        assert!(ShopError::from(RepositoryError::Unavailable("down".to_owned())).is_retryable());
        assert!(!ShopError::from(RepositoryError::Conflict("dup".to_owned())).is_retryable());
        assert!(!ShopError::EmptyCart { user_id: UserId::new(1) }.is_retryable());
        assert!(!ShopError::NotFound(Entity::Order(OrderId::new(1))).is_retryable());
    }
}
