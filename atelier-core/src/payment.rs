use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Intent creation request. Amounts are in minor currency units (cents).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentRequest {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub amount_minor: i64,
    pub currency: String,
}

/// Provider-side payment intent reference. The `client_secret` is handed to
/// the storefront client so it can complete the payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String, // Provider's ID (e.g., pi_123)
    pub client_secret: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payment provider error: {0}")]
    Provider(String),

    #[error("payment provider timed out")]
    Timeout,

    #[error("invalid intent request: {0}")]
    InvalidRequest(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment intent with the provider. Confirmation arrives later
    /// on an independent webhook channel, never on this call.
    async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, PaymentError>;
}

/// Gateway stand-in for tests and local development.
pub struct MockGateway {
    fail: bool,
}

impl MockGateway {
    pub fn new() -> Self {
        Self { fail: false }
    }

    /// A gateway that rejects every intent, for exercising refund paths.
    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, PaymentError> {
        if self.fail {
            return Err(PaymentError::Provider("simulated gateway failure".into()));
        }
        if request.amount_minor <= 0 {
            return Err(PaymentError::InvalidRequest(format!(
                "amount must be positive, got {}",
                request.amount_minor
            )));
        }
        // Encode the order id in the intent id so tests can trace it back
        Ok(PaymentIntent {
            id: format!("mock_pi_{}", request.order_id.simple()),
            client_secret: Some(format!("mock_pi_{}_secret", request.order_id.simple())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_gateway_issues_intent_with_client_secret() {
        let gateway = MockGateway::new();
        let request = IntentRequest {
            order_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            amount_minor: 4000,
            currency: "usd".into(),
        };

        let intent = gateway.create_intent(&request).await.unwrap();
        assert!(intent.id.starts_with("mock_pi_"));
        assert!(intent.client_secret.is_some());
    }

    #[tokio::test]
    async fn failing_gateway_reports_provider_error() {
        let gateway = MockGateway::failing();
        let request = IntentRequest {
            order_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            amount_minor: 100,
            currency: "usd".into(),
        };

        let err = gateway.create_intent(&request).await.unwrap_err();
        assert!(matches!(err, PaymentError::Provider(_)));
    }
}
