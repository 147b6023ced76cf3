//! Integration tests for all-or-nothing checkout and order lifecycle.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use stockroom_core::{OrderStatus, TransitionPolicy};
use stockroom_integration_tests::{fill_cart, seed_product, seed_user, stock_of};
use stockroom_shop::{Fault, MemoryStore, Shop, ShopError};

// =============================================================================
// Failure Injection
// =============================================================================

#[tokio::test]
async fn test_failure_mid_checkout_leaves_no_trace() {
    for fault in [Fault::InsertOrder, Fault::InsertOrderItem, Fault::ClearCart, Fault::Commit] {
        let shop = Shop::new(MemoryStore::new());
        let p1 = seed_product(shop.store(), "Pen", "1.50", 10).await.unwrap();
        let p2 = seed_product(shop.store(), "Pad", "3.00", 4).await.unwrap();
        let user = seed_user(shop.store(), "carol").await.unwrap();
        fill_cart(&shop, user, p1, 2).await.unwrap();
        fill_cart(&shop, user, p2, 1).await.unwrap();

        shop.store().inject(fault);
        let err = shop.checkout(user).await.unwrap_err();
        assert!(matches!(err, ShopError::Storage(_)), "{fault:?}: {err:?}");

        assert_eq!(stock_of(&shop, p1).await.unwrap(), 10, "{fault:?}");
        assert_eq!(stock_of(&shop, p2).await.unwrap(), 4, "{fault:?}");
        assert_eq!(shop.list_cart(user).await.unwrap().lines.len(), 2, "{fault:?}");
        assert!(shop.list_orders(None).await.unwrap().is_empty(), "{fault:?}");
    }
}

#[tokio::test]
async fn test_lost_stock_race_is_retried_once() {
    let shop = Shop::new(MemoryStore::new());
    let product = seed_product(shop.store(), "Mug", "8.00", 3).await.unwrap();
    let user = seed_user(shop.store(), "dave").await.unwrap();
    fill_cart(&shop, user, product, 2).await.unwrap();

    shop.store().inject(Fault::TakeStock);
    let receipt = shop.checkout(user).await.unwrap();

    assert_eq!(receipt.order.total_amount, Decimal::new(1600, 2));
    assert_eq!(stock_of(&shop, product).await.unwrap(), 1);
    assert_eq!(shop.list_orders(None).await.unwrap().len(), 1);
    assert!(shop.store().pending_faults().is_empty());
}

#[tokio::test]
async fn test_repeated_stock_race_is_reported() {
    let shop = Shop::new(MemoryStore::new());
    let product = seed_product(shop.store(), "Mug", "8.00", 3).await.unwrap();
    let user = seed_user(shop.store(), "erin").await.unwrap();
    fill_cart(&shop, user, product, 1).await.unwrap();

    shop.store().inject(Fault::TakeStock);
    shop.store().inject(Fault::TakeStock);
    let err = shop.checkout(user).await.unwrap_err();

    assert!(matches!(err, ShopError::ConcurrencyConflict));
    assert!(err.is_retryable());
    assert_eq!(stock_of(&shop, product).await.unwrap(), 3);
    assert_eq!(shop.list_cart(user).await.unwrap().lines.len(), 1);
}

// =============================================================================
// Price Snapshot
// =============================================================================

#[tokio::test]
async fn test_order_keeps_checkout_price() {
    let shop = Shop::new(MemoryStore::new());
    let product = seed_product(shop.store(), "Chair", "49.00", 6).await.unwrap();
    let user = seed_user(shop.store(), "frank").await.unwrap();
    fill_cart(&shop, user, product, 2).await.unwrap();

    let receipt = shop.checkout(user).await.unwrap();
    shop.update_price(product, "59.00".parse().unwrap())
        .await
        .unwrap();

    let details = shop.get_order(receipt.order.id).await.unwrap();
    assert_eq!(details.order.total_amount, Decimal::new(9800, 2));
    assert_eq!(details.lines[0].item.unit_price, "49.00".parse().unwrap());
    assert_eq!(details.lines[0].product_name, "Chair");
    assert_eq!(details.purchaser.username, "frank");
}

// =============================================================================
// Order Lifecycle
// =============================================================================

#[tokio::test]
async fn test_order_walks_through_fulfillment() {
    let shop = Shop::new(MemoryStore::new()).with_policy(TransitionPolicy::ForwardOnly);
    let product = seed_product(shop.store(), "Desk", "120.00", 2).await.unwrap();
    let user = seed_user(shop.store(), "grace").await.unwrap();
    fill_cart(&shop, user, product, 1).await.unwrap();
    let order_id = shop.checkout(user).await.unwrap().order.id;

    assert_eq!(shop.list_orders(Some(OrderStatus::New)).await.unwrap().len(), 1);

    shop.set_order_status(order_id, OrderStatus::Assembling)
        .await
        .unwrap();
    shop.set_order_status(order_id, OrderStatus::Completed)
        .await
        .unwrap();

    let err = shop
        .set_order_status(order_id, OrderStatus::New)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::InvalidTransition { .. }));

    assert!(shop.list_orders(Some(OrderStatus::New)).await.unwrap().is_empty());
    let completed = shop.list_orders(Some(OrderStatus::Completed)).await.unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, order_id);
}
