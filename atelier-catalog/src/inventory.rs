use crate::product::MemoryCatalog;
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDirection {
    Decrease,
    Increase,
}

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("product not found: {0}")]
    NotFound(Uuid),

    #[error("not enough stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("stock adjustment must be positive, got {0}")]
    InvalidQuantity(i32),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Owns the stock count per product. All stock mutations go through
/// `adjust`; implementations must serialize conflicting adjustments on the
/// same product so two concurrent orders cannot oversell the last unit.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    async fn adjust(
        &self,
        product_id: Uuid,
        quantity: i32,
        direction: StockDirection,
    ) -> Result<(), InventoryError>;
}

#[async_trait]
impl InventoryLedger for MemoryCatalog {
    async fn adjust(
        &self,
        product_id: Uuid,
        quantity: i32,
        direction: StockDirection,
    ) -> Result<(), InventoryError> {
        if quantity <= 0 {
            return Err(InventoryError::InvalidQuantity(quantity));
        }

        // The map lock serializes conflicting adjustments
        let mut products = self.products.lock().await;
        let product = products
            .get_mut(&product_id)
            .ok_or(InventoryError::NotFound(product_id))?;

        match direction {
            StockDirection::Decrease => {
                if product.stock < quantity {
                    return Err(InventoryError::InsufficientStock {
                        product_id,
                        requested: quantity,
                        available: product.stock,
                    });
                }
                product.stock -= quantity;
            }
            StockDirection::Increase => {
                product.stock += quantity;
            }
        }
        product.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{Product, ProductRepository};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    async fn seeded(stock: i32) -> (MemoryCatalog, Uuid) {
        let catalog = MemoryCatalog::new();
        let product = Product::new("Denim Jacket", "denim-jacket", dec!(89.00), stock);
        let id = product.id;
        catalog.insert(&product).await.unwrap();
        (catalog, id)
    }

    #[tokio::test]
    async fn decrease_then_increase_is_symmetric() {
        let (catalog, id) = seeded(10).await;

        catalog.adjust(id, 4, StockDirection::Decrease).await.unwrap();
        assert_eq!(catalog.get(id).await.unwrap().unwrap().stock, 6);

        catalog.adjust(id, 4, StockDirection::Increase).await.unwrap();
        assert_eq!(catalog.get(id).await.unwrap().unwrap().stock, 10);
    }

    #[tokio::test]
    async fn decrease_past_available_fails_without_mutation() {
        let (catalog, id) = seeded(3).await;

        let err = catalog.adjust(id, 5, StockDirection::Decrease).await.unwrap_err();
        match err {
            InventoryError::InsufficientStock {
                product_id,
                requested,
                available,
            } => {
                assert_eq!(product_id, id);
                assert_eq!(requested, 5);
                assert_eq!(available, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(catalog.get(id).await.unwrap().unwrap().stock, 3);
    }

    #[tokio::test]
    async fn unknown_product_is_reported() {
        let catalog = MemoryCatalog::new();
        let err = catalog
            .adjust(Uuid::new_v4(), 1, StockDirection::Decrease)
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn non_positive_quantity_is_rejected() {
        let (catalog, id) = seeded(3).await;
        for quantity in [0, -2] {
            let err = catalog
                .adjust(id, quantity, StockDirection::Decrease)
                .await
                .unwrap_err();
            assert!(matches!(err, InventoryError::InvalidQuantity(_)));
        }
    }

    #[tokio::test]
    async fn concurrent_decreases_never_oversell() {
        let (catalog, id) = seeded(5).await;
        let catalog = Arc::new(catalog);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let catalog = catalog.clone();
            handles.push(tokio::spawn(async move {
                catalog.adjust(id, 1, StockDirection::Decrease).await.is_ok()
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }

        // Exactly the starting stock worth of decreases may succeed
        assert_eq!(successes, 5);
        assert_eq!(catalog.get(id).await.unwrap().unwrap().stock, 0);
    }
}
