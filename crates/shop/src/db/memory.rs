//! In-process store for tests and local experiments.
//!
//! All tables live behind one `tokio::sync::Mutex`. A transaction holds the
//! lock from `begin` until it is committed or dropped, so transactions are
//! serialized. Writes go to a working copy that replaces the shared tables on
//! commit and is thrown away on drop.
//!
//! Constraints of the SQL schema (unique keys, foreign keys, non-negative
//! stock, positive quantities) are checked here too and reported as
//! [`RepositoryError::Conflict`].

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use stockroom_core::{
    CartItemId, CategoryId, OrderId, OrderItemId, OrderStatus, Price, ProductId, UserId,
};

use super::{RepositoryError, Store, StoreTx};
use crate::models::{
    CartItem, CartLine, Category, NewOrder, NewOrderItem, NewProduct, Order, OrderItem, OrderLine,
    Product, ProductDetails, ProductFilter, Purchaser, SalesSummary,
};

/// A one-shot failure to trigger inside the next transaction that reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// `insert_order` fails with `Unavailable`.
    InsertOrder,
    /// `insert_order_item` fails with `Unavailable`.
    InsertOrderItem,
    /// `take_stock` reports a lost race without changing stock.
    TakeStock,
    /// `clear_cart` fails with `Unavailable`.
    ClearCart,
    /// `commit` fails with `Unavailable` and discards the transaction.
    Commit,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    next_id: i32,
    categories: BTreeMap<CategoryId, Category>,
    users: BTreeMap<UserId, Purchaser>,
    products: BTreeMap<ProductId, Product>,
    cart_items: BTreeMap<CartItemId, CartItem>,
    orders: BTreeMap<OrderId, Order>,
    order_items: BTreeMap<OrderItemId, OrderItem>,
}

impl Tables {
    /// Next key. Shared across tables, which is fine for opaque ids.
    fn allocate(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn cart_item_for(&self, user_id: UserId, product_id: ProductId) -> Option<&CartItem> {
        self.cart_items
            .values()
            .find(|c| c.user_id == user_id && c.product_id == product_id)
    }

    fn product_name(&self, id: ProductId) -> Result<String, RepositoryError> {
        self.products
            .get(&id)
            .map(|p| p.name.clone())
            .ok_or_else(|| RepositoryError::DataCorruption(format!("dangling product {id}")))
    }
}

fn injected(fault: Fault) -> RepositoryError {
    RepositoryError::Unavailable(format!("injected fault: {fault:?}"))
}

fn most_recent_first(a: &Order, b: &Order) -> std::cmp::Ordering {
    b.order_date.cmp(&a.order_date).then(b.id.cmp(&a.id))
}

/// In-memory [`Store`].
///
/// Cloning yields another handle to the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<std::sync::Mutex<Vec<Fault>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a fault. Each armed fault fires once.
    pub fn inject(&self, fault: Fault) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(fault);
    }

    /// Faults armed but not yet fired.
    #[must_use]
    pub fn pending_faults(&self) -> Vec<Fault> {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, RepositoryError> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let work = guard.clone();
        Ok(MemoryTx {
            guard,
            work,
            faults: Arc::clone(&self.faults),
        })
    }
}

/// An open in-memory transaction.
#[derive(Debug)]
pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
    faults: Arc<std::sync::Mutex<Vec<Fault>>>,
}

impl MemoryTx {
    /// Consume `fault` if armed.
    fn trip(&self, fault: Fault) -> bool {
        let mut faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        match faults.iter().position(|f| *f == fault) {
            Some(index) => {
                faults.remove(index);
                true
            }
            None => false,
        }
    }
}

impl StoreTx for MemoryTx {
    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.work.products.get(&id).cloned())
    }

    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let mut keys = ids.to_vec();
        keys.sort_unstable();
        keys.dedup();
        Ok(keys
            .iter()
            .filter_map(|id| self.work.products.get(id).cloned())
            .collect())
    }

    async fn products(&mut self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let mut products: Vec<Product> = self
            .work
            .products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn insert_product(&mut self, product: &NewProduct) -> Result<Product, RepositoryError> {
        if product.stock_quantity < 0 {
            return Err(RepositoryError::Conflict(
                "stock_quantity must not be negative".to_owned(),
            ));
        }
        if let Some(category_id) = product.category_id
            && !self.work.categories.contains_key(&category_id)
        {
            return Err(RepositoryError::Conflict(format!(
                "category {category_id} does not exist"
            )));
        }

        let id = ProductId::new(self.work.allocate());
        let row = Product {
            id,
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            image_url: product.image_url.clone(),
            category_id: product.category_id,
            stock_quantity: product.stock_quantity,
        };
        self.work.products.insert(id, row.clone());
        Ok(row)
    }

    async fn set_price(
        &mut self,
        id: ProductId,
        price: Price,
    ) -> Result<Option<Product>, RepositoryError> {
        Ok(self.work.products.get_mut(&id).map(|p| {
            p.price = price;
            p.clone()
        }))
    }

    async fn update_product(
        &mut self,
        id: ProductId,
        details: &ProductDetails,
    ) -> Result<Option<Product>, RepositoryError> {
        if let Some(category_id) = details.category_id
            && !self.work.categories.contains_key(&category_id)
        {
            return Err(RepositoryError::Conflict(format!(
                "category {category_id} does not exist"
            )));
        }
        Ok(self.work.products.get_mut(&id).map(|p| {
            p.name.clone_from(&details.name);
            p.description.clone_from(&details.description);
            p.image_url.clone_from(&details.image_url);
            p.category_id = details.category_id;
            p.clone()
        }))
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<bool, RepositoryError> {
        if self.work.order_items.values().any(|i| i.product_id == id) {
            return Err(RepositoryError::Conflict(format!(
                "product {id} is referenced by order items"
            )));
        }
        if self.work.products.remove(&id).is_none() {
            return Ok(false);
        }
        self.work.cart_items.retain(|_, c| c.product_id != id);
        Ok(true)
    }

    async fn add_stock(
        &mut self,
        id: ProductId,
        amount: i32,
    ) -> Result<Option<Product>, RepositoryError> {
        let Some(product) = self.work.products.get_mut(&id) else {
            return Ok(None);
        };
        let stock = product
            .stock_quantity
            .checked_add(amount)
            .filter(|s| *s >= 0)
            .ok_or_else(|| RepositoryError::Conflict(format!("stock of product {id} out of range")))?;
        product.stock_quantity = stock;
        Ok(Some(product.clone()))
    }

    async fn take_stock(&mut self, id: ProductId, quantity: i32) -> Result<bool, RepositoryError> {
        if self.trip(Fault::TakeStock) {
            return Ok(false);
        }
        match self.work.products.get_mut(&id) {
            Some(product) if product.stock_quantity >= quantity => {
                product.stock_quantity -= quantity;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn category(&mut self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        Ok(self.work.categories.get(&id).cloned())
    }

    async fn categories(&mut self) -> Result<Vec<Category>, RepositoryError> {
        let mut categories: Vec<Category> = self.work.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn insert_category(
        &mut self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Category, RepositoryError> {
        if self.work.categories.values().any(|c| c.name == name) {
            return Err(RepositoryError::Conflict(format!(
                "category {name} already exists"
            )));
        }
        let id = CategoryId::new(self.work.allocate());
        let row = Category {
            id,
            name: name.to_owned(),
            description: description.map(str::to_owned),
        };
        self.work.categories.insert(id, row.clone());
        Ok(row)
    }

    async fn delete_category(&mut self, id: CategoryId) -> Result<bool, RepositoryError> {
        if self.work.categories.remove(&id).is_none() {
            return Ok(false);
        }
        for product in self.work.products.values_mut() {
            if product.category_id == Some(id) {
                product.category_id = None;
            }
        }
        Ok(true)
    }

    async fn purchaser(&mut self, id: UserId) -> Result<Option<Purchaser>, RepositoryError> {
        Ok(self.work.users.get(&id).cloned())
    }

    async fn insert_user(&mut self, username: &str, email: &str) -> Result<Purchaser, RepositoryError> {
        if self.work.users.values().any(|u| u.username == username) {
            return Err(RepositoryError::Conflict(format!(
                "user {username} already exists"
            )));
        }
        let id = UserId::new(self.work.allocate());
        let row = Purchaser {
            id,
            username: username.to_owned(),
            email: email.to_owned(),
        };
        self.work.users.insert(id, row.clone());
        Ok(row)
    }

    async fn lock_cart_item(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, RepositoryError> {
        Ok(self.work.cart_item_for(user_id, product_id).copied())
    }

    async fn cart_items(&mut self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let mut items: Vec<CartItem> = self
            .work
            .cart_items
            .values()
            .filter(|c| c.user_id == user_id)
            .copied()
            .collect();
        items.sort_by_key(|c| c.product_id);
        Ok(items)
    }

    async fn cart_lines(&mut self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let items = self.cart_items(user_id).await?;
        items
            .into_iter()
            .map(|item| {
                let product = self.work.products.get(&item.product_id).ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "cart item {} references missing product {}",
                        item.id, item.product_id
                    ))
                })?;
                Ok(CartLine {
                    item,
                    product_name: product.name.clone(),
                    price: product.price,
                    stock_quantity: product.stock_quantity,
                })
            })
            .collect()
    }

    async fn insert_cart_item(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Option<CartItem>, RepositoryError> {
        if quantity < 1 {
            return Err(RepositoryError::Conflict("quantity must be at least 1".to_owned()));
        }
        if !self.work.users.contains_key(&user_id) {
            return Err(RepositoryError::Conflict(format!("user {user_id} does not exist")));
        }
        if !self.work.products.contains_key(&product_id) {
            return Err(RepositoryError::Conflict(format!(
                "product {product_id} does not exist"
            )));
        }
        if self.work.cart_item_for(user_id, product_id).is_some() {
            return Ok(None);
        }

        let id = CartItemId::new(self.work.allocate());
        let row = CartItem {
            id,
            user_id,
            product_id,
            quantity,
        };
        self.work.cart_items.insert(id, row);
        Ok(Some(row))
    }

    async fn set_cart_quantity(
        &mut self,
        id: CartItemId,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError> {
        if quantity < 1 {
            return Err(RepositoryError::Conflict("quantity must be at least 1".to_owned()));
        }
        let item = self
            .work
            .cart_items
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        item.quantity = quantity;
        Ok(*item)
    }

    async fn delete_cart_item(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let id = self.work.cart_item_for(user_id, product_id).map(|c| c.id);
        Ok(id.and_then(|id| self.work.cart_items.remove(&id)).is_some())
    }

    async fn clear_cart(&mut self, user_id: UserId) -> Result<u64, RepositoryError> {
        if self.trip(Fault::ClearCart) {
            return Err(injected(Fault::ClearCart));
        }
        let before = self.work.cart_items.len();
        self.work.cart_items.retain(|_, c| c.user_id != user_id);
        Ok((before - self.work.cart_items.len()) as u64)
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError> {
        if self.trip(Fault::InsertOrder) {
            return Err(injected(Fault::InsertOrder));
        }
        if !self.work.users.contains_key(&order.user_id) {
            return Err(RepositoryError::Conflict(format!(
                "user {} does not exist",
                order.user_id
            )));
        }
        if order.total_amount < Decimal::ZERO {
            return Err(RepositoryError::Conflict(
                "total_amount must not be negative".to_owned(),
            ));
        }

        let id = OrderId::new(self.work.allocate());
        let row = Order {
            id,
            user_id: order.user_id,
            order_date: order.order_date,
            status: order.status,
            total_amount: order.total_amount,
        };
        self.work.orders.insert(id, row.clone());
        Ok(row)
    }

    async fn insert_order_item(
        &mut self,
        order_id: OrderId,
        item: &NewOrderItem,
    ) -> Result<OrderItem, RepositoryError> {
        if self.trip(Fault::InsertOrderItem) {
            return Err(injected(Fault::InsertOrderItem));
        }
        if item.quantity < 1 {
            return Err(RepositoryError::Conflict("quantity must be at least 1".to_owned()));
        }
        if !self.work.orders.contains_key(&order_id) {
            return Err(RepositoryError::Conflict(format!("order {order_id} does not exist")));
        }
        if !self.work.products.contains_key(&item.product_id) {
            return Err(RepositoryError::Conflict(format!(
                "product {} does not exist",
                item.product_id
            )));
        }

        let id = OrderItemId::new(self.work.allocate());
        let row = OrderItem {
            id,
            order_id,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
        };
        self.work.order_items.insert(id, row);
        Ok(row)
    }

    async fn order(&mut self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.work.orders.get(&id).cloned())
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.order(id).await
    }

    async fn order_lines(&mut self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        self.work
            .order_items
            .values()
            .filter(|i| i.order_id == order_id)
            .map(|item| {
                Ok(OrderLine {
                    item: *item,
                    product_name: self.work.product_name(item.product_id)?,
                })
            })
            .collect()
    }

    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .work
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(most_recent_first);
        Ok(orders)
    }

    async fn orders(&mut self, status: Option<OrderStatus>) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .work
            .orders
            .values()
            .filter(|o| status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by(most_recent_first);
        Ok(orders)
    }

    async fn set_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        Ok(self.work.orders.get_mut(&id).map(|o| {
            o.status = status;
            o.clone()
        }))
    }

    async fn sales_summary(
        &mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<SalesSummary, RepositoryError> {
        let placed = self
            .work
            .orders
            .values()
            .filter(|o| o.order_date >= from && o.order_date < to);
        let (order_count, revenue) = placed.fold((0_i64, Decimal::ZERO), |(n, sum), o| {
            (n + 1, sum + o.total_amount)
        });
        Ok(SalesSummary {
            from,
            to,
            order_count,
            revenue,
        })
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        if self.trip(Fault::Commit) {
            return Err(injected(Fault::Commit));
        }
        let Self { mut guard, work, .. } = self;
        *guard = work;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryStore, UserId, ProductId) {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let user = tx.insert_user("alice", "alice@example.com").await.unwrap();
        let product = tx
            .insert_product(&NewProduct {
                name: "Widget".to_owned(),
                description: None,
                price: "2.50".parse().unwrap(),
                image_url: None,
                category_id: None,
                stock_quantity: 4,
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();
        (store, user.id, product.id)
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let (store, user, product) = seeded().await;
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_cart_item(user, product, 1).await.unwrap();
            assert!(tx.take_stock(product, 4).await.unwrap());
        }
        let mut tx = store.begin().await.unwrap();
        assert!(tx.cart_items(user).await.unwrap().is_empty());
        assert_eq!(tx.product(product).await.unwrap().unwrap().stock_quantity, 4);
    }

    #[tokio::test]
    async fn test_take_stock_is_guarded() {
        let (store, _, product) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        assert!(!tx.take_stock(product, 5).await.unwrap());
        assert!(tx.take_stock(product, 4).await.unwrap());
        assert_eq!(tx.product(product).await.unwrap().unwrap().stock_quantity, 0);
    }

    #[tokio::test]
    async fn test_cart_pair_is_unique() {
        let (store, user, product) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        let first = tx.insert_cart_item(user, product, 1).await.unwrap().unwrap();
        assert_eq!(tx.insert_cart_item(user, product, 3).await.unwrap(), None);
        assert_eq!(tx.lock_cart_item(user, product).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_foreign_keys_are_checked() {
        let (store, user, _) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        let err = tx
            .insert_cart_item(user, ProductId::new(999), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_commit_fault_discards_writes() {
        let (store, user, product) = seeded().await;
        store.inject(Fault::Commit);
        let mut tx = store.begin().await.unwrap();
        tx.insert_cart_item(user, product, 2).await.unwrap();
        assert!(matches!(
            tx.commit().await,
            Err(RepositoryError::Unavailable(_))
        ));
        assert!(store.pending_faults().is_empty());

        let mut tx = store.begin().await.unwrap();
        assert!(tx.lock_cart_item(user, product).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_product_cascades_to_carts() {
        let (store, user, product) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        tx.insert_cart_item(user, product, 2).await.unwrap();
        assert!(tx.delete_product(product).await.unwrap());
        assert!(!tx.delete_product(product).await.unwrap());
        assert!(tx.cart_items(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_product_with_orders_is_refused() {
        let (store, user, product) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        let order = tx
            .insert_order(&NewOrder {
                user_id: user,
                order_date: Utc::now(),
                status: OrderStatus::New,
                total_amount: Decimal::new(250, 2),
            })
            .await
            .unwrap();
        tx.insert_order_item(
            order.id,
            &NewOrderItem {
                product_id: product,
                quantity: 1,
                unit_price: "2.50".parse().unwrap(),
            },
        )
        .await
        .unwrap();

        let err = tx.delete_product(product).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert!(tx.product(product).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_category_uncategorizes_products() {
        let (store, _, product) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        let category = tx.insert_category("Tools", None).await.unwrap();
        let details = ProductDetails {
            name: "Widget".to_owned(),
            description: None,
            image_url: None,
            category_id: Some(category.id),
        };
        tx.update_product(product, &details).await.unwrap();

        assert!(tx.delete_category(category.id).await.unwrap());
        assert_eq!(tx.product(product).await.unwrap().unwrap().category_id, None);
        assert!(!tx.delete_category(category.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_take_stock_fault_fires_once() {
        let (store, _, product) = seeded().await;
        store.inject(Fault::TakeStock);
        let mut tx = store.begin().await.unwrap();
        assert!(!tx.take_stock(product, 1).await.unwrap());
        assert!(tx.take_stock(product, 1).await.unwrap());
    }
}
