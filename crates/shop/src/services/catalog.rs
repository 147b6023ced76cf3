//! Catalog browsing and administration.
//!
//! Stock can only grow here. The only path that decrements stock is checkout.

use tracing::{info, instrument, warn};

use stockroom_core::{CategoryId, Price, ProductId};

use crate::db::{RepositoryError, Store, StoreTx};
use crate::error::{Entity, ShopError};
use crate::models::{Category, NewProduct, Product, ProductDetails, ProductFilter};

/// Catalog operations.
pub struct Catalog<'a, S> {
    store: &'a S,
}

impl<'a, S: Store> Catalog<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Products matching `filter`, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Storage` if the store fails.
    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, ShopError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.products(filter).await?)
    }

    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if the product does not exist.
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ShopError> {
        let mut tx = self.store.begin().await?;
        tx.product(id)
            .await?
            .ok_or(ShopError::NotFound(Entity::Product(id)))
    }

    /// Add a product to the catalog.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::InvalidInput` for a blank name or negative stock.
    /// Returns `ShopError::NotFound` if the category does not exist.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create_product(&self, product: NewProduct) -> Result<Product, ShopError> {
        let name = product.name.trim();
        if name.is_empty() {
            return Err(ShopError::InvalidInput("product name must not be empty".to_owned()));
        }
        if product.stock_quantity < 0 {
            return Err(ShopError::InvalidInput(format!(
                "initial stock must not be negative (got {})",
                product.stock_quantity
            )));
        }
        let product = NewProduct {
            name: name.to_owned(),
            ..product
        };

        let mut tx = self.store.begin().await?;
        if let Some(category_id) = product.category_id
            && tx.category(category_id).await?.is_none()
        {
            return Err(ShopError::NotFound(Entity::Category(category_id)));
        }
        let created = tx.insert_product(&product).await?;
        tx.commit().await?;

        info!(product_id = %created.id, stock = created.stock_quantity, "Product created");
        Ok(created)
    }

    /// Change a product's price. Existing orders keep their prices.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if the product does not exist.
    #[instrument(skip_all, fields(product_id = %id, price = %price))]
    pub async fn update_price(&self, id: ProductId, price: Price) -> Result<Product, ShopError> {
        let mut tx = self.store.begin().await?;
        let product = tx
            .set_price(id, price)
            .await?
            .ok_or(ShopError::NotFound(Entity::Product(id)))?;
        tx.commit().await?;

        info!("Price updated");
        Ok(product)
    }

    /// Replace a product's name, description, image and category.
    ///
    /// Price and stock are untouched; use [`Self::update_price`] and
    /// [`Self::restock`] for those.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::InvalidInput` for a blank name.
    /// Returns `ShopError::NotFound` if the product or category does not exist.
    #[instrument(skip(self, details), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: ProductId,
        details: ProductDetails,
    ) -> Result<Product, ShopError> {
        let name = details.name.trim();
        if name.is_empty() {
            return Err(ShopError::InvalidInput("product name must not be empty".to_owned()));
        }
        let details = ProductDetails {
            name: name.to_owned(),
            ..details
        };

        let mut tx = self.store.begin().await?;
        if let Some(category_id) = details.category_id
            && tx.category(category_id).await?.is_none()
        {
            return Err(ShopError::NotFound(Entity::Category(category_id)));
        }
        let product = tx
            .update_product(id, &details)
            .await?
            .ok_or(ShopError::NotFound(Entity::Product(id)))?;
        tx.commit().await?;

        info!(name = %product.name, "Product updated");
        Ok(product)
    }

    /// Remove a product from the catalog. Cart lines holding it go with it.
    ///
    /// Returns `false` if there was no such product.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::InvalidInput` if an order references the product.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: ProductId) -> Result<bool, ShopError> {
        let mut tx = self.store.begin().await?;
        let deleted = match tx.delete_product(id).await {
            Ok(deleted) => deleted,
            Err(RepositoryError::Conflict(_)) => {
                warn!("Product is referenced by orders");
                return Err(ShopError::InvalidInput(format!(
                    "product {id} appears in orders and cannot be deleted"
                )));
            }
            Err(e) => return Err(e.into()),
        };
        tx.commit().await?;

        if deleted {
            info!("Product deleted");
        }
        Ok(deleted)
    }

    /// Increase a product's stock by `amount`.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::InvalidInput` if `amount` is not positive.
    /// Returns `ShopError::NotFound` if the product does not exist.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub async fn restock(&self, id: ProductId, amount: i32) -> Result<Product, ShopError> {
        if amount <= 0 {
            return Err(ShopError::InvalidInput(format!(
                "restock amount must be positive (got {amount})"
            )));
        }

        let mut tx = self.store.begin().await?;
        let product = tx
            .add_stock(id, amount)
            .await?
            .ok_or(ShopError::NotFound(Entity::Product(id)))?;
        tx.commit().await?;

        info!(amount, stock = product.stock_quantity, "Product restocked");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `ShopError::InvalidInput` if the name is blank or already used.
    #[instrument(skip(self, description))]
    pub async fn create_category(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Category, ShopError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ShopError::InvalidInput("category name must not be empty".to_owned()));
        }

        let mut tx = self.store.begin().await?;
        let category = match tx.insert_category(name, description).await {
            Ok(category) => category,
            Err(RepositoryError::Conflict(_)) => {
                warn!("Category name already taken");
                return Err(ShopError::InvalidInput(format!(
                    "category {name} already exists"
                )));
            }
            Err(e) => return Err(e.into()),
        };
        tx.commit().await?;

        info!(category_id = %category.id, "Category created");
        Ok(category)
    }

    /// Remove a category. Its products stay in the catalog, uncategorized.
    ///
    /// Returns `false` if there was no such category.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Storage` if the store fails.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<bool, ShopError> {
        let mut tx = self.store.begin().await?;
        let deleted = tx.delete_category(id).await?;
        tx.commit().await?;

        if deleted {
            info!("Category deleted");
        }
        Ok(deleted)
    }

    /// # Errors
    ///
    /// Returns `ShopError::Storage` if the store fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, ShopError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.categories().await?)
    }

    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if the category does not exist.
    pub async fn get_category(&self, id: CategoryId) -> Result<Category, ShopError> {
        let mut tx = self.store.begin().await?;
        tx.category(id)
            .await?
            .ok_or(ShopError::NotFound(Entity::Category(id)))
    }
}
