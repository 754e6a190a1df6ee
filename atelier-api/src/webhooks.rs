use atelier_core::webhook;
use atelier_order::OrderError;
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use crate::{error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/webhooks/stripe", post(handle_stripe_webhook))
}

/// POST /v1/webhooks/stripe
/// Receive payment status updates from Stripe. The signature is verified
/// over the raw body before anything is parsed out of it.
async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::InvalidWebhook("missing stripe-signature header".into()))?;

    let event = webhook::verify_event(
        &body,
        signature,
        &state.webhook.secret,
        state.webhook.tolerance_secs,
    )?;

    if event.event_type == "payment_intent.succeeded" {
        let Some(order_id) = event.data.object.metadata.order_id else {
            tracing::warn!(event_id = %event.id, "succeeded intent carries no order metadata");
            return Ok(Json(json!({ "status": "success" })));
        };

        match state.coordinator.confirm_payment(order_id).await {
            Ok(()) => {}
            // Acknowledge unknown orders so the provider stops retrying a
            // delivery we can never apply
            Err(OrderError::NotFound(_)) => {
                tracing::warn!(%order_id, event_id = %event.id, "webhook for unknown order ignored");
            }
            Err(err) => return Err(err.into()),
        }
    } else {
        tracing::debug!(event_id = %event.id, event_type = %event.event_type, "unhandled webhook event");
    }

    Ok(Json(json!({ "status": "success" })))
}
