use async_trait::async_trait;
use atelier_order::{Order, OrderError, OrderItem, OrderRepository, PaymentMethod, PaymentStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    shipping_address: String,
    payment_method: String,
    payment_status: String,
    total_price: Decimal,
    payment_intent_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    price: Decimal,
}

fn storage_err(e: sqlx::Error) -> OrderError {
    OrderError::Storage(e.to_string())
}

fn order_from_rows(row: OrderRow, item_rows: Vec<OrderItemRow>) -> Result<Order, OrderError> {
    let payment_status = PaymentStatus::parse(&row.payment_status)
        .ok_or_else(|| OrderError::Storage(format!("unknown payment status {}", row.payment_status)))?;
    let payment_method = PaymentMethod::parse(&row.payment_method)
        .ok_or_else(|| OrderError::Storage(format!("unknown payment method {}", row.payment_method)))?;

    Ok(Order {
        id: row.id,
        user_id: row.user_id,
        shipping_address: row.shipping_address,
        payment_method,
        payment_status,
        total_price: row.total_price,
        payment_intent_id: row.payment_intent_id,
        items: item_rows
            .into_iter()
            .map(|item| OrderItem {
                id: item.id,
                order_id: item.order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                price: item.price,
            })
            .collect(),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

const ORDER_COLUMNS: &str = "id, user_id, shipping_address, payment_method, payment_status, \
                             total_price, payment_intent_id, created_at, updated_at";

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create(&self, order: &Order) -> Result<(), OrderError> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, shipping_address, payment_method, payment_status,
                                total_price, payment_intent_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(&order.shipping_address)
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.total_price)
        .bind(&order.payment_intent_id)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, OrderError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItemRow>(
            "SELECT id, order_id, product_id, quantity, price FROM order_items WHERE order_id = $1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(Some(order_from_rows(row, items)?))
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, OrderError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        let mut orders = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(order) = self.get(id).await? {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    async fn attach_items(&self, order: &Order) -> Result<(), OrderError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, quantity, price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.price)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        }

        sqlx::query("UPDATE orders SET total_price = $2, updated_at = NOW() WHERE id = $1")
            .bind(order.id)
            .bind(order.total_price)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;

        tx.commit().await.map_err(storage_err)?;
        Ok(())
    }

    async fn set_payment_intent(&self, id: Uuid, intent_id: &str) -> Result<(), OrderError> {
        let result = sqlx::query(
            "UPDATE orders SET payment_intent_id = $2, updated_at = NOW() \
             WHERE id = $1 AND payment_intent_id IS NULL",
        )
        .bind(id)
        .bind(intent_id)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(OrderError::Storage(format!(
                "order {id} missing or already carries a payment intent"
            )));
        }
        Ok(())
    }

    async fn mark_completed(&self, id: Uuid) -> Result<bool, OrderError> {
        self.transition(id, PaymentStatus::Completed).await
    }

    async fn mark_failed(&self, id: Uuid) -> Result<bool, OrderError> {
        self.transition(id, PaymentStatus::Failed).await
    }
}

impl PgOrderRepository {
    /// Conditional transition out of Pending. The WHERE guard makes the
    /// transition claimable exactly once under concurrent callers.
    async fn transition(&self, id: Uuid, to: PaymentStatus) -> Result<bool, OrderError> {
        let result = sqlx::query(
            "UPDATE orders SET payment_status = $2, updated_at = NOW() \
             WHERE id = $1 AND payment_status = $3",
        )
        .bind(id)
        .bind(to.as_str())
        .bind(PaymentStatus::Pending.as_str())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(result.rows_affected() == 1)
    }
}
