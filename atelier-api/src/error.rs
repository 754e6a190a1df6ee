use atelier_catalog::{CatalogError, InventoryError, ReviewError, WishlistError};
use atelier_core::identity::IdentityError;
use atelier_core::webhook::WebhookError;
use atelier_order::OrderError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    AuthenticationError(String),
    NotFoundError(String),
    ConflictError(String),
    InsufficientStock {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },
    PaymentFailed(String),
    InvalidWebhook(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            AppError::AuthenticationError(msg) => {
                (StatusCode::UNAUTHORIZED, "authentication_error", msg)
            }
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, "conflict", msg),
            AppError::InsufficientStock {
                product_id,
                requested,
                available,
            } => {
                let body = Json(json!({
                    "error": format!(
                        "not enough stock for product {product_id}: requested {requested}, available {available}"
                    ),
                    "code": "insufficient_stock",
                    "product_id": product_id,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::PaymentFailed(msg) => (StatusCode::PAYMENT_REQUIRED, "payment_failed", msg),
            AppError::InvalidWebhook(msg) => (StatusCode::BAD_REQUEST, "invalid_webhook", msg),
            AppError::InternalServerError(err) => {
                tracing::error!("Internal Server Error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Inventory(InventoryError::InsufficientStock {
                product_id,
                requested,
                available,
            }) => AppError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            OrderError::Inventory(InventoryError::InvalidQuantity(q)) => {
                AppError::ValidationError(format!("quantity must be positive, got {q}"))
            }
            OrderError::Inventory(InventoryError::NotFound(id))
            | OrderError::ProductNotFound(id) => {
                AppError::ValidationError(format!("unknown product {id}"))
            }
            OrderError::NotFound(id) => AppError::NotFoundError(format!("order {id} not found")),
            OrderError::InvalidTotal { order_id, total } => AppError::InternalServerError(
                anyhow::anyhow!("order {order_id} has unchargeable total {total}"),
            ),
            OrderError::Payment(e) => AppError::PaymentFailed(e.to_string()),
            OrderError::Inventory(InventoryError::Storage(msg)) | OrderError::Storage(msg) => {
                AppError::InternalServerError(anyhow::anyhow!(msg))
            }
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(id) => {
                AppError::NotFoundError(format!("product {id} not found"))
            }
            CatalogError::Storage(msg) => AppError::InternalServerError(anyhow::anyhow!(msg)),
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::NotFound => AppError::NotFoundError("user not found".to_string()),
            IdentityError::EmailTaken(email) => {
                AppError::ConflictError(format!("email {email} is already registered"))
            }
            IdentityError::Storage(msg) => AppError::InternalServerError(anyhow::anyhow!(msg)),
        }
    }
}

impl From<ReviewError> for AppError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::InvalidRating(_) => AppError::ValidationError(err.to_string()),
            ReviewError::AlreadyReviewed { .. } => AppError::ConflictError(err.to_string()),
            ReviewError::Storage(msg) => AppError::InternalServerError(anyhow::anyhow!(msg)),
        }
    }
}

impl From<WishlistError> for AppError {
    fn from(err: WishlistError) -> Self {
        match err {
            WishlistError::Storage(msg) => AppError::InternalServerError(anyhow::anyhow!(msg)),
        }
    }
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        AppError::InvalidWebhook(err.to_string())
    }
}
