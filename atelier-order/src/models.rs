use atelier_catalog::{CatalogError, InventoryError};
use atelier_core::payment::PaymentError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payment status in the order lifecycle. Pending is the only non-terminal
/// state; Completed and Failed are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(PaymentStatus::Pending),
            "COMPLETED" => Some(PaymentStatus::Completed),
            "FAILED" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "CARD",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CARD" => Some(PaymentMethod::Card),
            _ => None,
        }
    }
}

/// One requested line of a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// A line item snapshot. `price` is the unit price copied from the product
/// at build time, immutable afterwards, so order history is decoupled from
/// later price changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
}

impl OrderItem {
    pub fn new(order_id: Uuid, product_id: Uuid, quantity: i32, price: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            product_id,
            quantity,
            price,
        }
    }

    pub fn subtotal(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// The single source of truth for a customer's purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shipping_address: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub total_price: Decimal,
    pub payment_intent_id: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(user_id: Uuid, shipping_address: String, payment_method: PaymentMethod) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            shipping_address,
            payment_method,
            payment_status: PaymentStatus::Pending,
            total_price: Decimal::ZERO,
            payment_intent_id: None,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn add_item(&mut self, item: OrderItem) {
        self.items.push(item);
        self.updated_at = Utc::now();
    }

    /// Recompute the derived total as the sum of line item subtotals.
    pub fn recompute_total(&mut self) {
        self.total_price = self.items.iter().map(OrderItem::subtotal).sum();
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("order not found: {0}")]
    NotFound(Uuid),

    #[error("order {order_id} total {total} cannot be expressed in minor units")]
    InvalidTotal { order_id: Uuid, total: Decimal },

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<CatalogError> for OrderError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(id) => OrderError::ProductNotFound(id),
            CatalogError::Storage(message) => OrderError::Storage(message),
        }
    }
}
