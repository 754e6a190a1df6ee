use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// A sellable catalog entry. `stock` is owned by the inventory ledger and
/// must only be mutated through its adjust operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(name: impl Into<String>, slug: impl Into<String>, price: Decimal, stock: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            slug: slug.into(),
            description: String::new(),
            price,
            stock,
            available: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("product not found: {0}")]
    NotFound(Uuid),

    #[error("storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn insert(&self, product: &Product) -> Result<(), CatalogError>;
    async fn get(&self, id: Uuid) -> Result<Option<Product>, CatalogError>;
    async fn list(&self) -> Result<Vec<Product>, CatalogError>;
}

/// In-memory catalog backing unit tests and local development. Implements
/// the inventory ledger as well, so one product map serves both concerns.
pub struct MemoryCatalog {
    pub(crate) products: Mutex<HashMap<Uuid, Product>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            products: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProductRepository for MemoryCatalog {
    async fn insert(&self, product: &Product) -> Result<(), CatalogError> {
        let mut products = self.products.lock().await;
        products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Product>, CatalogError> {
        let products = self.products.lock().await;
        Ok(products.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        let products = self.products.lock().await;
        let mut all: Vec<Product> = products.values().filter(|p| p.available).cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn insert_and_fetch_product() {
        let catalog = MemoryCatalog::new();
        let product = Product::new("Linen Shirt", "linen-shirt", dec!(49.90), 12);
        catalog.insert(&product).await.unwrap();

        let fetched = catalog.get(product.id).await.unwrap().unwrap();
        assert_eq!(fetched.price, dec!(49.90));
        assert_eq!(fetched.stock, 12);
    }

    #[tokio::test]
    async fn list_hides_unavailable_products() {
        let catalog = MemoryCatalog::new();
        let mut hidden = Product::new("Archive Coat", "archive-coat", dec!(200.00), 1);
        hidden.available = false;
        catalog.insert(&hidden).await.unwrap();
        catalog
            .insert(&Product::new("Wool Scarf", "wool-scarf", dec!(35.00), 5))
            .await
            .unwrap();

        let listed = catalog.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].slug, "wool-scarf");
    }
}
