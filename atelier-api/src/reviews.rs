use atelier_catalog::{Review, ReviewSummary};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, middleware::auth::CustomerClaims, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CreateReview {
    pub product_id: Uuid,
    pub rating: i32,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct ProductReviews {
    pub summary: ReviewSummary,
    pub reviews: Vec<Review>,
}

/// Reading a product's reviews is public; posting one requires a customer
/// token, so the write route lives behind the auth middleware.
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/v1/products/{id}/reviews", get(list_reviews))
}

pub fn authed_routes() -> Router<AppState> {
    Router::new().route("/v1/reviews", post(create_review))
}

async fn list_reviews(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ProductReviews>, AppError> {
    state
        .catalog
        .get(product_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("product {product_id} not found")))?;

    let summary = state.reviews.summary(product_id).await?;
    let reviews = state.reviews.list_for_product(product_id).await?;
    Ok(Json(ProductReviews { summary, reviews }))
}

async fn create_review(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Json(payload): Json<CreateReview>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    let product_id = payload.product_id;
    state
        .catalog
        .get(product_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("product {product_id} not found")))?;

    let review = Review::new(product_id, claims.sub, payload.rating, payload.comment)?;
    state.reviews.insert(&review).await?;

    tracing::info!(%product_id, user_id = %claims.sub, rating = review.rating, "review posted");
    Ok((StatusCode::CREATED, Json(review)))
}
