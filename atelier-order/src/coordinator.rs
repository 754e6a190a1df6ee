use crate::aggregate::{release_items, OrderAggregate};
use crate::models::{LineRequest, Order, OrderError, PaymentMethod, PaymentStatus};
use crate::repository::OrderRepository;
use atelier_catalog::{InventoryLedger, ProductRepository};
use atelier_core::money;
use atelier_core::payment::{IntentRequest, PaymentError, PaymentGateway, PaymentIntent};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Checkout settings handed to the coordinator at construction.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub currency: String,
    /// Bound on the synchronous intent-creation round trip; elapsing it is
    /// treated as a processing failure and triggers a refund.
    pub payment_timeout: Duration,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            currency: "usd".into(),
            payment_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct PlaceOrder {
    pub shipping_address: String,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub items: Vec<LineRequest>,
}

/// What the storefront client needs to finish checkout.
#[derive(Debug)]
pub struct CheckoutReceipt {
    pub order: Order,
    pub client_secret: Option<String>,
}

/// Drives an order through Pending → Completed / Failed. The coordinator is
/// the only place that decides whether a failure requires a refund, i.e.
/// whether stock was actually reserved before the failure.
pub struct OrderCoordinator {
    orders: Arc<dyn OrderRepository>,
    ledger: Arc<dyn InventoryLedger>,
    gateway: Arc<dyn PaymentGateway>,
    aggregate: OrderAggregate,
    config: CheckoutConfig,
}

impl OrderCoordinator {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        catalog: Arc<dyn ProductRepository>,
        ledger: Arc<dyn InventoryLedger>,
        gateway: Arc<dyn PaymentGateway>,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            orders,
            ledger: ledger.clone(),
            gateway,
            aggregate: OrderAggregate::new(catalog, ledger),
            config,
        }
    }

    /// Create → reserve → request payment intent. Stock reservation is
    /// all-or-nothing and always completes before the intent is requested.
    pub async fn place_order(
        &self,
        user_id: Uuid,
        request: PlaceOrder,
    ) -> Result<CheckoutReceipt, OrderError> {
        let mut order = Order::new(user_id, request.shipping_address, request.payment_method);
        self.orders.create(&order).await?;

        // On failure the aggregate has already rolled its reservations back;
        // the order stays Pending with no items and no intent.
        self.aggregate.build(&mut order, &request.items).await?;

        if let Err(err) = self.orders.attach_items(&order).await {
            // The items were never committed, so refund() would find nothing
            // to release; claim the Failed mark here and hand the stock back
            // from the in-memory build instead.
            match self.orders.mark_failed(order.id).await {
                Ok(true) => {
                    release_items(self.ledger.as_ref(), order.id, &order.items).await;
                }
                Ok(false) => {}
                Err(mark_err) => {
                    tracing::error!(order_id = %order.id, "failed to mark order after attach failure: {mark_err}");
                    release_items(self.ledger.as_ref(), order.id, &order.items).await;
                }
            }
            return Err(err);
        }

        let intent = match self.request_intent(&order, user_id).await {
            Ok(intent) => intent,
            Err(err) => {
                tracing::warn!(order_id = %order.id, "payment intent creation failed: {err}");
                self.refund_after_failure(order.id).await;
                return Err(err);
            }
        };

        if let Err(err) = self.orders.set_payment_intent(order.id, &intent.id).await {
            self.refund_after_failure(order.id).await;
            return Err(err);
        }
        order.payment_intent_id = Some(intent.id);

        tracing::info!(
            order_id = %order.id,
            total = %order.total_price,
            "order placed, awaiting payment confirmation"
        );
        Ok(CheckoutReceipt {
            order,
            client_secret: intent.client_secret,
        })
    }

    async fn request_intent(&self, order: &Order, user_id: Uuid) -> Result<PaymentIntent, OrderError> {
        let amount_minor = money::to_minor_units(order.total_price).ok_or(OrderError::InvalidTotal {
            order_id: order.id,
            total: order.total_price,
        })?;
        let request = IntentRequest {
            order_id: order.id,
            user_id,
            amount_minor,
            currency: self.config.currency.clone(),
        };
        match tokio::time::timeout(self.config.payment_timeout, self.gateway.create_intent(&request))
            .await
        {
            Ok(Ok(intent)) => Ok(intent),
            Ok(Err(err)) => Err(err.into()),
            Err(_) => Err(PaymentError::Timeout.into()),
        }
    }

    /// Drive the Pending → Completed transition from a verified provider
    /// event. Duplicate deliveries for an already-completed order are a
    /// no-op; an unknown order surfaces as `NotFound` without side effects.
    pub async fn confirm_payment(&self, order_id: Uuid) -> Result<(), OrderError> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;

        match order.payment_status {
            PaymentStatus::Completed => {
                tracing::debug!(%order_id, "duplicate payment confirmation ignored");
                Ok(())
            }
            PaymentStatus::Failed => {
                tracing::warn!(%order_id, "payment confirmation for a refunded order ignored");
                Ok(())
            }
            PaymentStatus::Pending => {
                if self.orders.mark_completed(order_id).await? {
                    tracing::info!(%order_id, "payment confirmed, order completed");
                } else {
                    tracing::debug!(%order_id, "order left pending before confirmation applied");
                }
                Ok(())
            }
        }
    }

    /// Restore stock for every line item and mark the order Failed. The
    /// Failed mark is claimed first via a conditional transition out of
    /// Pending, so stock is restored at most once per order no matter how
    /// many failure paths race here.
    pub async fn refund(&self, order_id: Uuid) -> Result<(), OrderError> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;

        if order.payment_status != PaymentStatus::Pending {
            tracing::debug!(%order_id, status = ?order.payment_status, "refund skipped, order not pending");
            return Ok(());
        }
        if !self.orders.mark_failed(order_id).await? {
            return Ok(());
        }

        release_items(self.ledger.as_ref(), order_id, &order.items).await;
        tracing::info!(%order_id, "order refunded, stock restored");
        Ok(())
    }

    async fn refund_after_failure(&self, order_id: Uuid) {
        if let Err(err) = self.refund(order_id).await {
            tracing::error!(%order_id, "automatic refund failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryOrderStore;
    use async_trait::async_trait;
    use atelier_catalog::{MemoryCatalog, Product, ProductRepository};
    use atelier_core::payment::MockGateway;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tokio::sync::Mutex;

    /// Mock gateway that records every intent request it sees.
    struct RecordingGateway {
        requests: Mutex<Vec<IntentRequest>>,
    }

    impl RecordingGateway {
        fn new() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PaymentGateway for RecordingGateway {
        async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, PaymentError> {
            self.requests.lock().await.push(request.clone());
            Ok(PaymentIntent {
                id: format!("pi_{}", request.order_id.simple()),
                client_secret: Some("cs_test".into()),
            })
        }
    }

    /// Gateway that never answers within any sane timeout.
    struct StalledGateway;

    #[async_trait]
    impl PaymentGateway for StalledGateway {
        async fn create_intent(&self, _request: &IntentRequest) -> Result<PaymentIntent, PaymentError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(PaymentError::Timeout)
        }
    }

    struct Harness {
        coordinator: OrderCoordinator,
        catalog: Arc<MemoryCatalog>,
        orders: Arc<MemoryOrderStore>,
    }

    fn harness(gateway: Arc<dyn PaymentGateway>) -> Harness {
        let catalog = Arc::new(MemoryCatalog::new());
        let orders = Arc::new(MemoryOrderStore::new());
        let coordinator = OrderCoordinator::new(
            orders.clone(),
            catalog.clone(),
            catalog.clone(),
            gateway,
            CheckoutConfig {
                currency: "usd".into(),
                payment_timeout: Duration::from_millis(100),
            },
        );
        Harness {
            coordinator,
            catalog,
            orders,
        }
    }

    async fn seed(catalog: &MemoryCatalog, price: Decimal, stock: i32) -> Uuid {
        let product = Product::new("Trench Coat", "trench-coat", price, stock);
        let id = product.id;
        catalog.insert(&product).await.unwrap();
        id
    }

    fn line(product_id: Uuid, quantity: i32) -> PlaceOrder {
        PlaceOrder {
            shipping_address: "5 Carnaby St".into(),
            payment_method: PaymentMethod::Card,
            items: vec![LineRequest { product_id, quantity }],
        }
    }

    #[tokio::test]
    async fn happy_path_requests_intent_in_minor_units() {
        let gateway = Arc::new(RecordingGateway::new());
        let h = harness(gateway.clone());
        let product_id = seed(&h.catalog, dec!(20.00), 10).await;
        let user_id = Uuid::new_v4();

        let receipt = h.coordinator.place_order(user_id, line(product_id, 2)).await.unwrap();

        assert_eq!(receipt.order.total_price, dec!(40.00));
        assert_eq!(receipt.client_secret.as_deref(), Some("cs_test"));
        assert_eq!(h.catalog.get(product_id).await.unwrap().unwrap().stock, 8);

        let requests = gateway.requests.lock().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].amount_minor, 4000);
        assert_eq!(requests[0].currency, "usd");
        assert_eq!(requests[0].order_id, receipt.order.id);
        assert_eq!(requests[0].user_id, user_id);

        let stored = h.orders.get(receipt.order.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Pending);
        assert_eq!(stored.total_price, dec!(40.00));
        assert!(receipt.order.payment_intent_id.is_some());
    }

    #[tokio::test]
    async fn insufficient_stock_leaves_order_pending_and_empty() {
        let h = harness(Arc::new(MockGateway::new()));
        let p_id = seed(&h.catalog, dec!(30.00), 5).await;
        let q = Product::new("Sold Out Hat", "sold-out-hat", dec!(15.00), 0);
        let q_id = q.id;
        h.catalog.insert(&q).await.unwrap();
        let user_id = Uuid::new_v4();

        let request = PlaceOrder {
            shipping_address: "5 Carnaby St".into(),
            payment_method: PaymentMethod::Card,
            items: vec![
                LineRequest { product_id: p_id, quantity: 3 },
                LineRequest { product_id: q_id, quantity: 1 },
            ],
        };
        let err = h.coordinator.place_order(user_id, request).await.unwrap_err();
        assert!(matches!(err, OrderError::Inventory(_)));

        // Rollback restored P, order exists with no items and no intent
        assert_eq!(h.catalog.get(p_id).await.unwrap().unwrap().stock, 5);
        let orders = h.orders.list_for_user(user_id).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].payment_status, PaymentStatus::Pending);
        assert!(orders[0].items.is_empty());
        assert!(orders[0].payment_intent_id.is_none());
    }

    #[tokio::test]
    async fn gateway_failure_refunds_reserved_stock() {
        let h = harness(Arc::new(MockGateway::failing()));
        let product_id = seed(&h.catalog, dec!(20.00), 10).await;
        let user_id = Uuid::new_v4();

        let err = h.coordinator.place_order(user_id, line(product_id, 2)).await.unwrap_err();
        assert!(matches!(err, OrderError::Payment(PaymentError::Provider(_))));

        assert_eq!(h.catalog.get(product_id).await.unwrap().unwrap().stock, 10);
        let orders = h.orders.list_for_user(user_id).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].payment_status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn gateway_timeout_is_a_processing_failure() {
        let h = harness(Arc::new(StalledGateway));
        let product_id = seed(&h.catalog, dec!(10.00), 3).await;
        let user_id = Uuid::new_v4();

        let err = h.coordinator.place_order(user_id, line(product_id, 1)).await.unwrap_err();
        assert!(matches!(err, OrderError::Payment(PaymentError::Timeout)));

        assert_eq!(h.catalog.get(product_id).await.unwrap().unwrap().stock, 3);
        let orders = h.orders.list_for_user(user_id).await.unwrap();
        assert_eq!(orders[0].payment_status, PaymentStatus::Failed);
    }

    /// Order store whose item persistence always fails, for exercising the
    /// failure path between reservation and intent creation.
    struct BrokenAttachStore {
        inner: MemoryOrderStore,
    }

    #[async_trait]
    impl crate::repository::OrderRepository for BrokenAttachStore {
        async fn create(&self, order: &Order) -> Result<(), OrderError> {
            self.inner.create(order).await
        }

        async fn get(&self, id: Uuid) -> Result<Option<Order>, OrderError> {
            self.inner.get(id).await
        }

        async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, OrderError> {
            self.inner.list_for_user(user_id).await
        }

        async fn attach_items(&self, _order: &Order) -> Result<(), OrderError> {
            Err(OrderError::Storage("simulated write failure".into()))
        }

        async fn set_payment_intent(&self, id: Uuid, intent_id: &str) -> Result<(), OrderError> {
            self.inner.set_payment_intent(id, intent_id).await
        }

        async fn mark_completed(&self, id: Uuid) -> Result<bool, OrderError> {
            self.inner.mark_completed(id).await
        }

        async fn mark_failed(&self, id: Uuid) -> Result<bool, OrderError> {
            self.inner.mark_failed(id).await
        }
    }

    #[tokio::test]
    async fn attach_failure_restores_stock_and_fails_the_order() {
        let catalog = Arc::new(MemoryCatalog::new());
        let orders = Arc::new(BrokenAttachStore {
            inner: MemoryOrderStore::new(),
        });
        let coordinator = OrderCoordinator::new(
            orders.clone(),
            catalog.clone(),
            catalog.clone(),
            Arc::new(MockGateway::new()),
            CheckoutConfig::default(),
        );
        let product_id = seed(&catalog, dec!(20.00), 10).await;
        let user_id = Uuid::new_v4();

        let err = coordinator.place_order(user_id, line(product_id, 2)).await.unwrap_err();
        assert!(matches!(err, OrderError::Storage(_)));

        // Reservation was rolled back and the order is terminal, not Pending
        assert_eq!(catalog.get(product_id).await.unwrap().unwrap().stock, 10);
        let orders = orders.list_for_user(user_id).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].payment_status, PaymentStatus::Failed);
        assert!(orders[0].payment_intent_id.is_none());
    }

    #[tokio::test]
    async fn confirmation_is_idempotent() {
        let h = harness(Arc::new(MockGateway::new()));
        let product_id = seed(&h.catalog, dec!(20.00), 10).await;
        let receipt = h
            .coordinator
            .place_order(Uuid::new_v4(), line(product_id, 1))
            .await
            .unwrap();

        h.coordinator.confirm_payment(receipt.order.id).await.unwrap();
        let stored = h.orders.get(receipt.order.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Completed);
        let updated_at = stored.updated_at;

        // Duplicate delivery: no additional state change
        h.coordinator.confirm_payment(receipt.order.id).await.unwrap();
        let stored = h.orders.get(receipt.order.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Completed);
        assert_eq!(stored.updated_at, updated_at);
    }

    #[tokio::test]
    async fn confirmation_of_unknown_order_is_not_found() {
        let h = harness(Arc::new(MockGateway::new()));
        let err = h.coordinator.confirm_payment(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, OrderError::NotFound(_)));
    }

    #[tokio::test]
    async fn refund_restores_stock_at_most_once() {
        let h = harness(Arc::new(MockGateway::new()));
        let product_id = seed(&h.catalog, dec!(20.00), 10).await;
        let receipt = h
            .coordinator
            .place_order(Uuid::new_v4(), line(product_id, 4))
            .await
            .unwrap();
        assert_eq!(h.catalog.get(product_id).await.unwrap().unwrap().stock, 6);

        h.coordinator.refund(receipt.order.id).await.unwrap();
        assert_eq!(h.catalog.get(product_id).await.unwrap().unwrap().stock, 10);
        let stored = h.orders.get(receipt.order.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Failed);

        // Second refund must not double-restore
        h.coordinator.refund(receipt.order.id).await.unwrap();
        assert_eq!(h.catalog.get(product_id).await.unwrap().unwrap().stock, 10);
    }

    #[tokio::test]
    async fn refund_is_a_noop_on_completed_orders() {
        let h = harness(Arc::new(MockGateway::new()));
        let product_id = seed(&h.catalog, dec!(20.00), 10).await;
        let receipt = h
            .coordinator
            .place_order(Uuid::new_v4(), line(product_id, 2))
            .await
            .unwrap();
        h.coordinator.confirm_payment(receipt.order.id).await.unwrap();

        h.coordinator.refund(receipt.order.id).await.unwrap();
        let stored = h.orders.get(receipt.order.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Completed);
        assert_eq!(h.catalog.get(product_id).await.unwrap().unwrap().stock, 8);
    }
}
