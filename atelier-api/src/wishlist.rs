use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::AppError, middleware::auth::CustomerClaims, products::ProductResponse, state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ToggleProduct {
    pub product_id: Uuid,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/wishlist", get(list_wishlist))
        .route("/v1/wishlist/toggle", post(toggle_product))
}

async fn list_wishlist(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let ids = state.wishlist.product_ids_for_user(claims.sub).await?;

    let mut products = Vec::with_capacity(ids.len());
    for id in ids {
        // Entries for since-removed products are silently skipped
        if let Some(product) = state.catalog.get(id).await? {
            products.push(product.into());
        }
    }
    Ok(Json(products))
}

async fn toggle_product(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Json(payload): Json<ToggleProduct>,
) -> Result<Json<Value>, AppError> {
    state
        .catalog
        .get(payload.product_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFoundError(format!("product {} not found", payload.product_id))
        })?;

    let change = state.wishlist.toggle(claims.sub, payload.product_id).await?;
    Ok(Json(json!({ "status": change.as_str() })))
}
