//! Cart operations. Every mutation ends by rederiving the cart total from the
//! active items and persisting it.
use uuid::Uuid;

use super::{inventory, Deps};
use crate::domain::aggregates::{Cart, Item};
use crate::domain::value_objects::{Quantity, Sku};
use crate::error::{Result, ShopError};
use crate::store::StoreError;

#[derive(Clone)]
pub struct CartService {
    deps: Deps,
}

impl CartService {
    pub fn new(deps: Deps) -> Self { Self { deps } }

    async fn load(&self, user_id: Uuid) -> Result<Cart> {
        let cart = self.deps.store.cart_by_user(user_id).await?.ok_or(ShopError::CartNotFound)?;
        let items = self.deps.store.active_items(cart.id).await?;
        cart.with_items(items)
    }

    /// Re-reads the active items, recomputes the total and stores it.
    pub async fn recompute_total(&self, cart: Cart) -> Result<Cart> {
        let items = self.deps.store.active_items(cart.id).await?;
        let cart = cart.with_items(items)?;
        self.deps.store.set_cart_total(cart.id, cart.total).await?;
        Ok(cart)
    }

    #[tracing::instrument(skip(self))]
    pub async fn view(&self, user_id: Uuid) -> Result<Cart> {
        let cart = self.load(user_id).await?;
        self.deps.store.set_cart_total(cart.id, cart.total).await?;
        Ok(cart)
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_item(&self, user_id: Uuid, sku: Sku, quantity: Quantity) -> Result<Cart> {
        let cart = self.load(user_id).await?;
        cart.ensure_room(self.deps.policy.max_cart_items)?;
        cart.ensure_absent(&sku)?;
        let product = inventory::check_availability(&*self.deps.store, &sku, quantity).await?;

        let item = Item::new(cart.id, product, quantity, self.deps.clock.now())?;
        let inserted = self.deps.store.insert_item(&item, self.deps.policy.max_cart_items).await;
        match inserted {
            Ok(()) => {}
            Err(StoreError::CartFull(max)) => return Err(ShopError::CartFull(max)),
            Err(StoreError::UniqueViolation(_)) => return Err(ShopError::AlreadyInCart(sku)),
            Err(StoreError::ForeignKeyViolation(_)) => return Err(ShopError::ProductNotFound(sku)),
            Err(e) => return Err(e.into()),
        }
        tracing::info!(cart_id = %cart.id, item_id = %item.id, "item added");
        self.recompute_total(cart).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_item(&self, user_id: Uuid, sku: Sku, quantity: Quantity) -> Result<Cart> {
        let cart = self.load(user_id).await?;
        let product_id = cart.require_item(&sku)?.product.id;
        let product = inventory::check_availability(&*self.deps.store, &sku, quantity).await?;

        let line_total = quantity.times(product.price)?;
        if !self.deps.store.update_item(cart.id, product_id, quantity, line_total).await? {
            return Err(ShopError::NotInCart(sku));
        }
        self.recompute_total(cart).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, user_id: Uuid, sku: Sku) -> Result<Cart> {
        let cart = self.load(user_id).await?;
        let product_id = cart.require_item(&sku)?.product.id;
        if !self.deps.store.delete_item(cart.id, product_id).await? {
            return Err(ShopError::NotInCart(sku));
        }
        self.recompute_total(cart).await
    }
}
