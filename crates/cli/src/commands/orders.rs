//! Checkout and order commands.

use chrono::{DateTime, NaiveDate, Utc};

use stockroom_core::{OrderId, OrderStatus, UserId};

use super::{CommandError, CommandResult, PgShop, print_json};

pub async fn checkout(shop: &PgShop, user_id: UserId) -> CommandResult {
    print_json(&shop.checkout(user_id).await?)
}

pub async fn show(shop: &PgShop, id: OrderId) -> CommandResult {
    print_json(&shop.get_order(id).await?)
}

pub async fn history(shop: &PgShop, user_id: UserId) -> CommandResult {
    print_json(&shop.list_order_history(user_id).await?)
}

pub async fn set_status(shop: &PgShop, id: OrderId, status: OrderStatus) -> CommandResult {
    print_json(&shop.set_order_status(id, status).await?)
}

pub async fn list(shop: &PgShop, status: Option<OrderStatus>) -> CommandResult {
    print_json(&shop.list_orders(status).await?)
}

/// Summarize whole UTC days `from..=to`. Both default to today.
pub async fn summary(
    shop: &PgShop,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> CommandResult {
    let today = Utc::now().date_naive();
    let (start, end) = day_range(from.unwrap_or(today), to.unwrap_or(today))?;
    print_json(&shop.sales_summary(start, end).await?)
}

/// Half-open timestamp range covering the days `first..=last`.
fn day_range(
    first: NaiveDate,
    last: NaiveDate,
) -> Result<(DateTime<Utc>, DateTime<Utc>), CommandError> {
    if first > last {
        return Err(CommandError::InvalidRange(format!(
            "{first} is after {last}"
        )));
    }
    let after_last = last
        .succ_opt()
        .ok_or_else(|| CommandError::InvalidRange(format!("{last} is out of range")))?;
    let midnight = |day: NaiveDate| {
        day.and_hms_opt(0, 0, 0)
            .map(|t| t.and_utc())
            .ok_or_else(|| CommandError::InvalidRange(format!("{day} has no midnight")))
    };
    Ok((midnight(first)?, midnight(after_last)?))
}
