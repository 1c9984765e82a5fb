//! Order history and cancellation.
use uuid::Uuid;

use super::{inventory, Deps};
use crate::domain::aggregates::Order;
use crate::error::{Result, ShopError};

#[derive(Clone)]
pub struct OrderService {
    deps: Deps,
}

impl OrderService {
    pub fn new(deps: Deps) -> Self { Self { deps } }

    /// All orders of the user, oldest first, canceled ones included.
    #[tracing::instrument(skip(self))]
    pub async fn history(&self, user_id: Uuid) -> Result<Vec<Order>> {
        Ok(self.deps.store.orders_by_user(user_id).await?)
    }

    /// Cancels a placed order inside the cancellation window. Other users' orders
    /// are reported as not found.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, user_id: Uuid, order_id: Uuid) -> Result<Order> {
        let mut order = self.deps.store.order_by_id(order_id).await?
            .filter(|o| o.user_id == user_id)
            .ok_or(ShopError::OrderNotFound)?;
        let event = order.cancel(self.deps.clock.now(), self.deps.policy.cancel_window)?;

        let tx = self.deps.store.begin().await?;
        if !tx.cancel_order(order.id).await? {
            return Err(ShopError::OrderAlreadyCanceled);
        }
        if self.deps.policy.restock_on_cancel {
            for item in &order.items {
                inventory::restock(&*tx, item.product.id, item.quantity).await?;
            }
        }
        tx.commit().await?;

        tracing::info!(order_id = %order.id, restocked = self.deps.policy.restock_on_cancel, "order canceled");
        self.deps.publisher.publish(event).await;
        Ok(order)
    }
}
