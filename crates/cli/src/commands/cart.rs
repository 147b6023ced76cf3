//! Cart commands.

use serde_json::json;

use stockroom_core::{ProductId, UserId};

use super::{CommandResult, PgShop, print_json};

pub async fn add(shop: &PgShop, user_id: UserId, product_id: ProductId) -> CommandResult {
    print_json(&shop.add_to_cart(user_id, product_id).await?)
}

pub async fn increment(shop: &PgShop, user_id: UserId, product_id: ProductId) -> CommandResult {
    print_json(&shop.increment_cart_item(user_id, product_id).await?)
}

pub async fn decrement(shop: &PgShop, user_id: UserId, product_id: ProductId) -> CommandResult {
    print_json(&shop.decrement_cart_item(user_id, product_id).await?)
}

pub async fn remove(shop: &PgShop, user_id: UserId, product_id: ProductId) -> CommandResult {
    let removed = shop.remove_cart_item(user_id, product_id).await?;
    print_json(&json!({
        "user_id": user_id,
        "product_id": product_id,
        "removed": removed,
    }))
}

/// Print the cart lines together with the cart total.
pub async fn list(shop: &PgShop, user_id: UserId) -> CommandResult {
    let view = shop.list_cart(user_id).await?;
    let lines: Vec<_> = view
        .lines
        .iter()
        .map(|line| {
            json!({
                "product_id": line.item.product_id,
                "product_name": line.product_name,
                "quantity": line.item.quantity,
                "price": line.price,
                "stock_quantity": line.stock_quantity,
                "line_total": line.line_total(),
            })
        })
        .collect();
    print_json(&json!({
        "user_id": user_id,
        "lines": lines,
        "units": view.unit_count(),
        "total": view.total(),
    }))
}
