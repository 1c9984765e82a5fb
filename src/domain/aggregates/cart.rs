//! Cart Aggregate
//!
//! A cart owns its *active* items: line items not yet claimed by an order.
//! The cached total is always rederived from those items, never accumulated.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::Product;
use crate::domain::value_objects::{Quantity, Sku};
use crate::error::ShopError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub order_id: Option<Uuid>,
    pub product: Product,
    pub quantity: Quantity,
    pub line_total: Decimal,
    pub ordered: bool,
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// New active item priced at the product's current unit price.
    pub fn new(cart_id: Uuid, product: Product, quantity: Quantity, now: DateTime<Utc>) -> Result<Self, ShopError> {
        let line_total = quantity.times(product.price)?;
        Ok(Self { id: Uuid::now_v7(), cart_id, order_id: None, product, quantity, line_total, ordered: false, created_at: now })
    }

    pub fn sku(&self) -> &Sku { &self.product.sku }
    pub fn is_active(&self) -> bool { !self.ordered }
}

/// Sum of active line totals; zero for an empty slice.
pub fn total_of(items: &[Item]) -> Result<Decimal, ShopError> {
    items.iter().filter(|i| i.is_active()).try_fold(Decimal::ZERO, |acc, i| {
        acc.checked_add(i.line_total).ok_or_else(|| ShopError::Invalid("cart total is out of range".into()))
    })
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<Item>,
    pub total: Decimal,
}

impl Cart {
    pub fn new(user_id: Uuid) -> Self {
        Self { id: Uuid::now_v7(), user_id, items: vec![], total: Decimal::ZERO }
    }

    /// Replaces the item list and rederives the total from it.
    pub fn with_items(mut self, items: Vec<Item>) -> Result<Self, ShopError> {
        self.total = total_of(&items)?;
        self.items = items;
        Ok(self)
    }

    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn item_for(&self, sku: &Sku) -> Option<&Item> { self.items.iter().find(|i| i.sku() == sku) }

    pub fn ensure_room(&self, max_items: usize) -> Result<(), ShopError> {
        if self.items.len() >= max_items { return Err(ShopError::CartFull(max_items)); }
        Ok(())
    }

    pub fn ensure_absent(&self, sku: &Sku) -> Result<(), ShopError> {
        match self.item_for(sku) {
            Some(_) => Err(ShopError::AlreadyInCart(sku.clone())),
            None => Ok(()),
        }
    }

    pub fn require_item(&self, sku: &Sku) -> Result<&Item, ShopError> {
        self.item_for(sku).ok_or_else(|| ShopError::NotInCart(sku.clone()))
    }

    /// Checkout preconditions: at least one item and a total at or above the minimum.
    pub fn ensure_checkout_ready(&self, minimum: Decimal) -> Result<(), ShopError> {
        if self.is_empty() { return Err(ShopError::EmptyCart); }
        if self.total < minimum { return Err(ShopError::BelowMinimumOrder { total: self.total, minimum }); }
        Ok(())
    }
}
