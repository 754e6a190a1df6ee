use crate::models::{Order, OrderError};
use async_trait::async_trait;
use uuid::Uuid;

/// Order persistence. Orders and their items are owned exclusively by the
/// coordinator driving that order's lifecycle; no other flow writes them.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a freshly created order (Pending, no items).
    async fn create(&self, order: &Order) -> Result<(), OrderError>;

    async fn get(&self, id: Uuid) -> Result<Option<Order>, OrderError>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, OrderError>;

    /// Persist the built line items and the recomputed total atomically.
    async fn attach_items(&self, order: &Order) -> Result<(), OrderError>;

    /// Record the provider intent reference. Assigned once per order.
    async fn set_payment_intent(&self, id: Uuid, intent_id: &str) -> Result<(), OrderError>;

    /// Pending → Completed. Returns false if the order was not Pending, so
    /// duplicate confirmations are a no-op.
    async fn mark_completed(&self, id: Uuid) -> Result<bool, OrderError>;

    /// Pending → Failed. Returns false if the order was not Pending; the
    /// caller must only restore stock when this returns true.
    async fn mark_failed(&self, id: Uuid) -> Result<bool, OrderError>;
}
