use crate::models::{LineRequest, Order, OrderError, OrderItem};
use atelier_catalog::{InventoryLedger, ProductRepository, StockDirection};
use std::sync::Arc;
use uuid::Uuid;

/// Materializes an order's line items against the inventory ledger.
pub struct OrderAggregate {
    catalog: Arc<dyn ProductRepository>,
    ledger: Arc<dyn InventoryLedger>,
}

impl OrderAggregate {
    pub fn new(catalog: Arc<dyn ProductRepository>, ledger: Arc<dyn InventoryLedger>) -> Self {
        Self { catalog, ledger }
    }

    /// Build line items on a pending order, all-or-nothing. Each line is
    /// reserved in request order; the unit price is snapshotted from the
    /// product at this instant. If any line fails, every previously reserved
    /// line is released before the error surfaces, leaving the order with no
    /// committed items and every touched product at its starting stock.
    pub async fn build(&self, order: &mut Order, lines: &[LineRequest]) -> Result<(), OrderError> {
        // Validate quantities up front so no stock moves for a bad request
        if let Some(line) = lines.iter().find(|line| line.quantity <= 0) {
            return Err(atelier_catalog::InventoryError::InvalidQuantity(line.quantity).into());
        }

        let mut reserved: Vec<OrderItem> = Vec::with_capacity(lines.len());

        for line in lines {
            let product = match self.catalog.get(line.product_id).await {
                Ok(Some(product)) => product,
                Ok(None) => {
                    self.release(&reserved).await;
                    return Err(OrderError::ProductNotFound(line.product_id));
                }
                Err(err) => {
                    self.release(&reserved).await;
                    return Err(err.into());
                }
            };

            if let Err(err) = self
                .ledger
                .adjust(line.product_id, line.quantity, StockDirection::Decrease)
                .await
            {
                self.release(&reserved).await;
                return Err(err.into());
            }

            reserved.push(OrderItem::new(order.id, product.id, line.quantity, product.price));
        }

        for item in reserved {
            order.add_item(item);
        }
        order.recompute_total();
        Ok(())
    }

    /// Hand reserved stock back after an aborted build.
    async fn release(&self, reserved: &[OrderItem]) {
        for item in reserved {
            if let Err(err) = self
                .ledger
                .adjust(item.product_id, item.quantity, StockDirection::Increase)
                .await
            {
                tracing::error!(
                    product_id = %item.product_id,
                    "failed to restore stock after aborted build: {err}"
                );
            }
        }
    }
}

/// Release every line item of an already-built order back to the ledger.
/// Best effort: failures are logged, the remaining items are still released.
pub(crate) async fn release_items(ledger: &dyn InventoryLedger, order_id: Uuid, items: &[OrderItem]) {
    for item in items {
        if let Err(err) = ledger
            .adjust(item.product_id, item.quantity, StockDirection::Increase)
            .await
        {
            tracing::error!(
                %order_id,
                product_id = %item.product_id,
                "stock restoration failed: {err}"
            );
        }
    }
}
