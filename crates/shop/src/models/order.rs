//! Orders and their immutable line items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_core::{OrderId, OrderItemId, OrderStatus, Price, ProductId, UserId};

/// A confirmed order.
///
/// `total_amount` is fixed at checkout and equals the sum of its items'
/// `unit_price * quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub total_amount: Decimal,
}

/// A purchased line, priced at the moment of checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    /// Snapshot of the product price at purchase time.
    pub unit_price: Price,
}

impl OrderItem {
    /// `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.line_total(self.quantity)
    }
}

/// An order item joined with the product name, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item: OrderItem,
    pub product_name: String,
}

/// Values for inserting an order row.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub total_amount: Decimal,
}

/// Values for inserting an order item row.
#[derive(Debug, Clone, Copy)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Price,
}

impl NewOrderItem {
    /// Sum of `unit_price * quantity` over `items`, `None` on overflow.
    #[must_use]
    pub fn total(items: &[Self]) -> Option<Decimal> {
        items.iter().try_fold(Decimal::ZERO, |acc, item| {
            acc.checked_add(item.unit_price.line_total(item.quantity)?)
        })
    }
}

/// Result of a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl Receipt {
    /// Recomputes the total from the items.
    #[must_use]
    pub fn items_total(&self) -> Option<Decimal> {
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.line_total()?))
    }
}

/// An order together with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

/// Identity of the user who placed an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchaser {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

/// Full order view for operator review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub purchaser: Purchaser,
}

/// Order count and revenue over a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub order_count: i64,
    pub revenue: Decimal,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn receipt() -> Receipt {
        let order_id = OrderId::new(1);
        let item = |id: i32, quantity: i32, price: &str| OrderItem {
            id: OrderItemId::new(id),
            order_id,
            product_id: ProductId::new(id),
            quantity,
            unit_price: price.parse().unwrap(),
        };
        Receipt {
            order: Order {
                id: order_id,
                user_id: UserId::new(1),
                order_date: Utc::now(),
                status: OrderStatus::New,
                total_amount: Decimal::new(3497, 2),
            },
            items: vec![item(1, 3, "9.99"), item(2, 1, "5.00")],
        }
    }

    #[test]
    fn test_receipt_items_total() {
        let receipt = receipt();
        assert_eq!(receipt.items_total(), Some(receipt.order.total_amount));
    }

    #[test]
    fn test_new_order_items_total_overflow() {
        let line = |price: Price| NewOrderItem {
            product_id: ProductId::new(1),
            quantity: i32::MAX,
            unit_price: price,
        };
        let small = [line("1.00".parse().unwrap())];
        assert_eq!(NewOrderItem::total(&small), Some(Decimal::from(i32::MAX)));

        let huge: Vec<_> = std::iter::repeat_n(line(Price::MAX), 4000).collect();
        assert_eq!(NewOrderItem::total(&huge), None);
    }

    #[test]
    fn test_receipt_json_shape() {
        let receipt = receipt();
        let value = serde_json::to_value(&receipt).unwrap();

        assert_eq!(value["order"]["status"], "new");
        assert_eq!(value["order"]["total_amount"], "34.97");
        assert_eq!(value["items"][0]["unit_price"], "9.99");
        assert_eq!(value["items"][1]["product_id"], 2);

        let back: Receipt = serde_json::from_value(value).unwrap();
        assert_eq!(back, receipt);
    }

    #[test]
    fn test_order_json_rejects_negative_unit_price() {
        let mut value = serde_json::to_value(receipt()).unwrap();
        value["items"][0]["unit_price"] = serde_json::json!("-1.00");
        assert!(serde_json::from_value::<Receipt>(value).is_err());
    }
}
