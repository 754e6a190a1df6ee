use crate::models::{Order, OrderError, PaymentStatus};
use crate::repository::OrderRepository;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// In-memory order store for tests and local development.
pub struct MemoryOrderStore {
    orders: Mutex<HashMap<Uuid, Order>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self {
            orders: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderStore {
    async fn create(&self, order: &Order) -> Result<(), OrderError> {
        let mut orders = self.orders.lock().await;
        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, OrderError> {
        let orders = self.orders.lock().await;
        Ok(orders.get(&id).cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, OrderError> {
        let orders = self.orders.lock().await;
        let mut owned: Vec<Order> = orders.values().filter(|o| o.user_id == user_id).cloned().collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn attach_items(&self, order: &Order) -> Result<(), OrderError> {
        let mut orders = self.orders.lock().await;
        let stored = orders.get_mut(&order.id).ok_or(OrderError::NotFound(order.id))?;
        stored.items = order.items.clone();
        stored.total_price = order.total_price;
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn set_payment_intent(&self, id: Uuid, intent_id: &str) -> Result<(), OrderError> {
        let mut orders = self.orders.lock().await;
        let stored = orders.get_mut(&id).ok_or(OrderError::NotFound(id))?;
        stored.payment_intent_id = Some(intent_id.to_string());
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_completed(&self, id: Uuid) -> Result<bool, OrderError> {
        self.transition(id, PaymentStatus::Completed).await
    }

    async fn mark_failed(&self, id: Uuid) -> Result<bool, OrderError> {
        self.transition(id, PaymentStatus::Failed).await
    }
}

impl MemoryOrderStore {
    async fn transition(&self, id: Uuid, to: PaymentStatus) -> Result<bool, OrderError> {
        let mut orders = self.orders.lock().await;
        let stored = orders.get_mut(&id).ok_or(OrderError::NotFound(id))?;
        if stored.payment_status != PaymentStatus::Pending {
            return Ok(false);
        }
        stored.payment_status = to;
        stored.updated_at = Utc::now();
        Ok(true)
    }
}
