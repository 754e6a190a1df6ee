use async_trait::async_trait;
use atelier_catalog::{WishlistChange, WishlistError, WishlistRepository};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgWishlistRepository {
    pool: PgPool,
}

impl PgWishlistRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn storage_err(e: sqlx::Error) -> WishlistError {
    WishlistError::Storage(e.to_string())
}

#[async_trait]
impl WishlistRepository for PgWishlistRepository {
    /// Remove-first toggle: the DELETE either claims the existing entry or
    /// affects nothing, in which case the entry is inserted.
    async fn toggle(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<WishlistChange, WishlistError> {
        let removed = sqlx::query(
            "DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        if removed.rows_affected() > 0 {
            return Ok(WishlistChange::Removed);
        }

        sqlx::query(
            "INSERT INTO wishlist_items (user_id, product_id, created_at) \
             VALUES ($1, $2, NOW()) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(WishlistChange::Added)
    }

    async fn product_ids_for_user(&self, user_id: Uuid) -> Result<Vec<Uuid>, WishlistError> {
        sqlx::query_scalar(
            "SELECT product_id FROM wishlist_items WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)
    }
}
