//! Integration tests for concurrent checkouts against the in-memory store.
//!
//! Two buyers race for the same product; the loser must see a stock error
//! and keep their cart, and stock must never go negative.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use stockroom_core::UserId;
use stockroom_integration_tests::{fill_cart, seed_product, seed_user, stock_of};
use stockroom_shop::{MemoryStore, Shop, ShopError};

// =============================================================================
// Two Buyers, One Shelf
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overlapping_checkouts_one_wins() {
    let shop = Arc::new(Shop::new(MemoryStore::new()));
    let product = seed_product(shop.store(), "Lamp", "20.00", 5)
        .await
        .unwrap();
    let alice = seed_user(shop.store(), "alice").await.unwrap();
    let bob = seed_user(shop.store(), "bob").await.unwrap();
    fill_cart(&shop, alice, product, 3).await.unwrap();
    fill_cart(&shop, bob, product, 4).await.unwrap();

    let a = tokio::spawn({
        let shop = Arc::clone(&shop);
        async move { shop.checkout(alice).await }
    });
    let b = tokio::spawn({
        let shop = Arc::clone(&shop);
        async move { shop.checkout(bob).await }
    });
    let (a, b) = (a.await.unwrap(), b.await.unwrap());

    let (winner, loser, won_qty, lost_qty, err) = match (a, b) {
        (Ok(_), Err(e)) => (alice, bob, 3, 4, e),
        (Err(e), Ok(_)) => (bob, alice, 4, 3, e),
        other => panic!("expected exactly one checkout to succeed, got {other:?}"),
    };

    let remaining = 5 - won_qty;
    assert_eq!(stock_of(&shop, product).await.unwrap(), remaining);
    match err {
        ShopError::InsufficientStock {
            product_id,
            available,
        } => {
            assert_eq!(product_id, product);
            assert_eq!(available, remaining);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    assert!(shop.list_cart(winner).await.unwrap().is_empty());
    let kept = shop.list_cart(loser).await.unwrap();
    assert_eq!(kept.lines.len(), 1);
    assert_eq!(kept.lines[0].item.quantity, lost_qty);

    assert_eq!(shop.list_order_history(winner).await.unwrap().len(), 1);
    assert!(shop.list_order_history(loser).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_buyers_never_oversell() {
    const BUYERS: usize = 12;
    const STOCK: i32 = 10;

    let shop = Arc::new(Shop::new(MemoryStore::new()));
    let product = seed_product(shop.store(), "Kettle", "35.00", STOCK)
        .await
        .unwrap();

    let mut users: Vec<UserId> = Vec::with_capacity(BUYERS);
    for i in 0..BUYERS {
        let user = seed_user(shop.store(), &format!("buyer{i}")).await.unwrap();
        fill_cart(&shop, user, product, 2).await.unwrap();
        users.push(user);
    }

    let handles: Vec<_> = users
        .iter()
        .map(|&user| {
            let shop = Arc::clone(&shop);
            tokio::spawn(async move { shop.checkout(user).await })
        })
        .collect();

    let mut sold = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(receipt) => sold += receipt.items[0].quantity,
            Err(ShopError::InsufficientStock { .. }) => {}
            Err(other) => panic!("unexpected checkout error: {other:?}"),
        }
    }

    assert_eq!(sold, STOCK);
    assert_eq!(stock_of(&shop, product).await.unwrap(), 0);
}

// =============================================================================
// Multi-line Carts
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_crossing_carts_do_not_deadlock() {
    let shop = Arc::new(Shop::new(MemoryStore::new()));
    let p1 = seed_product(shop.store(), "Cup", "4.00", 10).await.unwrap();
    let p2 = seed_product(shop.store(), "Saucer", "3.00", 10).await.unwrap();
    let alice = seed_user(shop.store(), "alice").await.unwrap();
    let bob = seed_user(shop.store(), "bob").await.unwrap();

    // Opposite insertion order so lock order would cross if it followed the cart.
    fill_cart(&shop, alice, p1, 2).await.unwrap();
    fill_cart(&shop, alice, p2, 2).await.unwrap();
    fill_cart(&shop, bob, p2, 3).await.unwrap();
    fill_cart(&shop, bob, p1, 3).await.unwrap();

    let a = tokio::spawn({
        let shop = Arc::clone(&shop);
        async move { shop.checkout(alice).await }
    });
    let b = tokio::spawn({
        let shop = Arc::clone(&shop);
        async move { shop.checkout(bob).await }
    });
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    assert_eq!(stock_of(&shop, p1).await.unwrap(), 5);
    assert_eq!(stock_of(&shop, p2).await.unwrap(), 5);
}

// =============================================================================
// Cart Lines Under Contention
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cart_clicks_are_all_counted() {
    let shop = Arc::new(Shop::new(MemoryStore::new()));
    let product = seed_product(shop.store(), "Cable", "5.00", 100)
        .await
        .unwrap();
    let user = seed_user(shop.store(), "ivan").await.unwrap();

    let adds: Vec<_> = (0..10)
        .map(|_| {
            let shop = Arc::clone(&shop);
            tokio::spawn(async move { shop.add_to_cart(user, product).await })
        })
        .collect();
    for handle in adds {
        handle.await.unwrap().unwrap();
    }
    let increments: Vec<_> = (0..10)
        .map(|_| {
            let shop = Arc::clone(&shop);
            tokio::spawn(async move { shop.increment_cart_item(user, product).await })
        })
        .collect();
    for handle in increments {
        handle.await.unwrap().unwrap();
    }

    let cart = shop.list_cart(user).await.unwrap();
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.lines[0].item.quantity, 20);
}
