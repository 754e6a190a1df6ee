use async_trait::async_trait;
use atelier_catalog::{CatalogError, InventoryError, InventoryLedger, Product, ProductRepository, StockDirection};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    slug: String,
    description: String,
    price: Decimal,
    stock: i32,
    available: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            price: row.price,
            stock: row.stock,
            available: row.available,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name, slug, description, price, stock, available, created_at, updated_at";

#[async_trait]
impl ProductRepository for PgCatalogRepository {
    async fn insert(&self, product: &Product) -> Result<(), CatalogError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, slug, description, price, stock, available, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.available)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| CatalogError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Product>, CatalogError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CatalogError::Storage(e.to_string()))?;
        Ok(row.map(Product::from))
    }

    async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE available ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CatalogError::Storage(e.to_string()))?;
        Ok(rows.into_iter().map(Product::from).collect())
    }
}

#[async_trait]
impl InventoryLedger for PgCatalogRepository {
    /// Decrease relies on a single guarded UPDATE, so concurrent orders for
    /// the last unit serialize on the row and exactly one of them wins.
    async fn adjust(
        &self,
        product_id: Uuid,
        quantity: i32,
        direction: StockDirection,
    ) -> Result<(), InventoryError> {
        if quantity <= 0 {
            return Err(InventoryError::InvalidQuantity(quantity));
        }

        match direction {
            StockDirection::Decrease => {
                let result = sqlx::query(
                    "UPDATE products SET stock = stock - $2, updated_at = NOW() \
                     WHERE id = $1 AND stock >= $2",
                )
                .bind(product_id)
                .bind(quantity)
                .execute(&self.pool)
                .await
                .map_err(|e| InventoryError::Storage(e.to_string()))?;

                if result.rows_affected() == 0 {
                    // Either the product is unknown or the row is short
                    let available = sqlx::query_scalar::<_, i32>(
                        "SELECT stock FROM products WHERE id = $1",
                    )
                    .bind(product_id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| InventoryError::Storage(e.to_string()))?;

                    return match available {
                        None => Err(InventoryError::NotFound(product_id)),
                        Some(available) => Err(InventoryError::InsufficientStock {
                            product_id,
                            requested: quantity,
                            available,
                        }),
                    };
                }
            }
            StockDirection::Increase => {
                let result = sqlx::query(
                    "UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1",
                )
                .bind(product_id)
                .bind(quantity)
                .execute(&self.pool)
                .await
                .map_err(|e| InventoryError::Storage(e.to_string()))?;

                if result.rows_affected() == 0 {
                    return Err(InventoryError::NotFound(product_id));
                }
            }
        }
        Ok(())
    }
}
