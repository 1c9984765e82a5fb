//! JSON shapes returned to clients.
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, Item, Order, OrderStatus, Product};
use crate::domain::value_objects::Sku;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: Uuid,
    pub sku: Sku,
    pub name: String,
    pub price: Decimal,
    pub category: Option<String>,
    pub in_stock: bool,
    /// Only shown to administrators.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl ProductView {
    pub fn public(p: Product) -> Self {
        Self { id: p.id, in_stock: p.is_in_stock(), sku: p.sku, name: p.name, price: p.price, category: p.category, stock: None, created_at: p.created_at }
    }

    pub fn admin(p: Product) -> Self {
        let stock = Some(p.stock);
        Self { stock, ..Self::public(p) }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    pub id: Uuid,
    pub sku: Sku,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
}

impl From<Item> for ItemView {
    fn from(i: Item) -> Self {
        Self { id: i.id, sku: i.product.sku, name: i.product.name, unit_price: i.product.price, quantity: i.quantity.get(), line_total: i.line_total }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub id: Uuid,
    pub item_count: usize,
    pub total: Decimal,
    pub items: Vec<ItemView>,
}

impl From<Cart> for CartView {
    fn from(c: Cart) -> Self {
        Self { id: c.id, item_count: c.item_count(), total: c.total, items: c.items.into_iter().map(ItemView::from).collect() }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: Uuid,
    pub status: OrderStatus,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub items: Vec<ItemView>,
}

impl From<Order> for OrderView {
    fn from(o: Order) -> Self {
        Self { id: o.id, status: o.status, total: o.total, created_at: o.created_at, items: o.items.into_iter().map(ItemView::from).collect() }
    }
}
