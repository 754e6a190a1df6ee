use atelier_order::{Order, PlaceOrder};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{error::AppError, middleware::auth::CustomerClaims, state::AppState};

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order: Order,
    pub client_secret: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/orders", post(create_order).get(list_orders))
        .route("/v1/orders/{id}", get(get_order))
}

async fn create_order(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Json(payload): Json<PlaceOrder>,
) -> Result<(StatusCode, Json<CheckoutResponse>), AppError> {
    if payload.items.is_empty() {
        return Err(AppError::ValidationError(
            "order must contain at least one item".into(),
        ));
    }

    let receipt = state.coordinator.place_order(claims.sub, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order: receipt.order,
            client_secret: receipt.client_secret,
        }),
    ))
}

async fn list_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = state.orders.list_for_user(claims.sub).await?;
    Ok(Json(orders))
}

async fn get_order(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .get(id)
        .await?
        // Hide other customers' orders behind the same 404
        .filter(|order| order.user_id == claims.sub)
        .ok_or_else(|| AppError::NotFoundError(format!("order {id} not found")))?;

    Ok(Json(order))
}
