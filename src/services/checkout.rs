//! Turns a user's active cart into a placed order.
//!
//! Everything after the precondition checks happens in one store transaction:
//! the order row, every stock decrement and the claim of the cart's items
//! either all land or none do.
use uuid::Uuid;

use super::{inventory, Deps};
use crate::domain::aggregates::{total_of, Order};
use crate::error::{Result, ShopError};

#[derive(Clone)]
pub struct CheckoutService {
    deps: Deps,
}

impl CheckoutService {
    pub fn new(deps: Deps) -> Self { Self { deps } }

    #[tracing::instrument(skip(self))]
    pub async fn place_order(&self, user_id: Uuid) -> Result<Order> {
        let store = &self.deps.store;
        let minimum = self.deps.policy.min_order_total;

        let cart = store.cart_by_user(user_id).await?.ok_or(ShopError::CartNotFound)?;
        let items = store.active_items(cart.id).await?;
        if items.is_empty() {
            return Err(ShopError::EmptyCart);
        }
        let cart = cart.with_items(items)?;
        cart.ensure_checkout_ready(minimum)?;

        let tx = store.begin().await?;
        let items = tx.active_items(cart.id).await?;
        if items.is_empty() {
            return Err(ShopError::CartAlreadyCheckedOut);
        }
        let cart = cart.with_items(items)?;
        cart.ensure_checkout_ready(minimum)?;

        let order = Order::place(user_id, cart.total, self.deps.clock.now());
        tx.insert_order(&order).await?;

        for item in &cart.items {
            inventory::check_availability(&*tx, item.sku(), item.quantity).await?;
            inventory::decrement_stock(&*tx, item.sku(), item.quantity).await?;
        }

        let item_ids: Vec<Uuid> = cart.items.iter().map(|i| i.id).collect();
        if tx.claim_items(order.id, &item_ids).await? != item_ids.len() as u64 {
            return Err(ShopError::CartAlreadyCheckedOut);
        }
        let remaining = tx.active_items(cart.id).await?;
        tx.set_cart_total(cart.id, total_of(&remaining)?).await?;

        let order = tx.order_by_id(order.id).await?
            .ok_or_else(|| ShopError::Internal(format!("order {} missing inside its own transaction", order.id)))?;
        tx.commit().await?;

        tracing::info!(order_id = %order.id, total = %order.total, items = order.items.len(), "order placed");
        self.deps.publisher.publish(order.placed_event()).await;
        Ok(order)
    }
}
