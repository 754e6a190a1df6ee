use async_trait::async_trait;
use atelier_catalog::{Review, ReviewError, ReviewRepository, ReviewSummary};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgReviewRepository {
    pool: PgPool,
}

impl PgReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    product_id: Uuid,
    user_id: Uuid,
    rating: i32,
    comment: String,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Review {
            id: row.id,
            product_id: row.product_id,
            user_id: row.user_id,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    count: i64,
    average_rating: Option<Decimal>,
}

#[async_trait]
impl ReviewRepository for PgReviewRepository {
    async fn insert(&self, review: &Review) -> Result<(), ReviewError> {
        sqlx::query(
            r#"
            INSERT INTO product_reviews (id, product_id, user_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(review.id)
        .bind(review.product_id)
        .bind(review.user_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => ReviewError::AlreadyReviewed {
                product_id: review.product_id,
                user_id: review.user_id,
            },
            _ => ReviewError::Storage(e.to_string()),
        })?;
        Ok(())
    }

    async fn list_for_product(&self, product_id: Uuid) -> Result<Vec<Review>, ReviewError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            "SELECT id, product_id, user_id, rating, comment, created_at \
             FROM product_reviews WHERE product_id = $1 ORDER BY created_at DESC",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ReviewError::Storage(e.to_string()))?;
        Ok(rows.into_iter().map(Review::from).collect())
    }

    async fn summary(&self, product_id: Uuid) -> Result<ReviewSummary, ReviewError> {
        let row = sqlx::query_as::<_, SummaryRow>(
            "SELECT COUNT(*) AS count, ROUND(AVG(rating), 2) AS average_rating \
             FROM product_reviews WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ReviewError::Storage(e.to_string()))?;
        Ok(ReviewSummary {
            count: row.count,
            average_rating: row.average_rating,
        })
    }
}
