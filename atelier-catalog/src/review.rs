use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// A customer's review of a product. One review per customer per product;
/// the rating is a whole number of stars from 1 to 5.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(
        product_id: Uuid,
        user_id: Uuid,
        rating: i32,
        comment: String,
    ) -> Result<Self, ReviewError> {
        if !(1..=5).contains(&rating) {
            return Err(ReviewError::InvalidRating(rating));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            product_id,
            user_id,
            rating,
            comment,
            created_at: Utc::now(),
        })
    }
}

/// Aggregate rating figures for a product's review list.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewSummary {
    pub count: i64,
    pub average_rating: Option<Decimal>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(i32),

    #[error("product {product_id} already reviewed by this customer")]
    AlreadyReviewed { product_id: Uuid, user_id: Uuid },

    #[error("storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn insert(&self, review: &Review) -> Result<(), ReviewError>;
    async fn list_for_product(&self, product_id: Uuid) -> Result<Vec<Review>, ReviewError>;
    async fn summary(&self, product_id: Uuid) -> Result<ReviewSummary, ReviewError>;
}

/// In-memory review store for tests and local development.
pub struct MemoryReviews {
    reviews: Mutex<HashMap<Uuid, Review>>,
}

impl MemoryReviews {
    pub fn new() -> Self {
        Self {
            reviews: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryReviews {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReviewRepository for MemoryReviews {
    async fn insert(&self, review: &Review) -> Result<(), ReviewError> {
        let mut reviews = self.reviews.lock().await;
        let duplicate = reviews
            .values()
            .any(|r| r.product_id == review.product_id && r.user_id == review.user_id);
        if duplicate {
            return Err(ReviewError::AlreadyReviewed {
                product_id: review.product_id,
                user_id: review.user_id,
            });
        }
        reviews.insert(review.id, review.clone());
        Ok(())
    }

    async fn list_for_product(&self, product_id: Uuid) -> Result<Vec<Review>, ReviewError> {
        let reviews = self.reviews.lock().await;
        let mut matching: Vec<Review> = reviews
            .values()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn summary(&self, product_id: Uuid) -> Result<ReviewSummary, ReviewError> {
        let reviews = self.reviews.lock().await;
        let ratings: Vec<i64> = reviews
            .values()
            .filter(|r| r.product_id == product_id)
            .map(|r| i64::from(r.rating))
            .collect();

        let count = ratings.len() as i64;
        let average_rating = if count == 0 {
            None
        } else {
            let total: i64 = ratings.iter().sum();
            // Two-decimal figure, matching the SQL ROUND(AVG(rating), 2)
            let mut average = (Decimal::from(total) / Decimal::from(count)).round_dp(2);
            average.rescale(2);
            Some(average)
        };
        Ok(ReviewSummary {
            count,
            average_rating,
        })
    }
}
