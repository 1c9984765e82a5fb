//! In-memory store for tests and standalone runs.
//!
//! All tables sit behind one async mutex, so every call is atomic. A
//! transaction holds that mutex for its whole lifetime and works on a copy of
//! the tables, which replaces the shared state only on commit.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{Inventory, PageRequest, Store, StoreError, StoreResult, StoreTx};
use crate::domain::aggregates::{Cart, Category, Item, Order, OrderStatus, Product, ProductPatch, User, MAX_STOCK};
use crate::domain::value_objects::{Quantity, Sku};

#[derive(Clone, Debug)]
struct CartRow { id: Uuid, user_id: Uuid, total: Decimal }

#[derive(Clone, Debug)]
struct ItemRow {
    id: Uuid,
    cart_id: Uuid,
    product_id: Uuid,
    order_id: Option<Uuid>,
    quantity: Quantity,
    line_total: Decimal,
    ordered: bool,
    created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
struct OrderRow { id: Uuid, user_id: Uuid, total: Decimal, status: OrderStatus, created_at: DateTime<Utc> }

#[derive(Clone, Debug, Default)]
struct Tables {
    categories: Vec<Category>,
    products: Vec<Product>,
    users: Vec<User>,
    carts: Vec<CartRow>,
    items: Vec<ItemRow>,
    orders: Vec<OrderRow>,
}

fn page_of<T: Clone>(rows: &[T], page: PageRequest) -> (Vec<T>, u64) {
    let start = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
    (rows.iter().skip(start).take(limit).cloned().collect(), rows.len() as u64)
}

impl Tables {
    fn product_by_sku(&self, sku: &Sku) -> Option<Product> {
        self.products.iter().find(|p| &p.sku == sku).cloned()
    }

    fn decrement_stock(&mut self, sku: &Sku, quantity: Quantity) -> bool {
        match self.products.iter_mut().find(|p| &p.sku == sku) {
            Some(p) if p.stock >= quantity.get() => { p.stock -= quantity.get(); true }
            _ => false,
        }
    }

    fn increment_stock(&mut self, product_id: Uuid, quantity: Quantity) -> bool {
        match self.products.iter_mut().find(|p| p.id == product_id) {
            Some(p) => { p.stock = p.stock.saturating_add(quantity.get()).min(MAX_STOCK); true }
            None => false,
        }
    }

    fn resolve(&self, row: &ItemRow) -> StoreResult<Item> {
        let product = self.products.iter().find(|p| p.id == row.product_id).cloned()
            .ok_or_else(|| StoreError::Corrupt(format!("item {} references missing product {}", row.id, row.product_id)))?;
        Ok(Item {
            id: row.id, cart_id: row.cart_id, order_id: row.order_id, product, quantity: row.quantity,
            line_total: row.line_total, ordered: row.ordered, created_at: row.created_at,
        })
    }

    fn items_where(&self, keep: impl Fn(&ItemRow) -> bool) -> StoreResult<Vec<Item>> {
        let mut rows: Vec<&ItemRow> = self.items.iter().filter(|r| keep(*r)).collect();
        rows.sort_by_key(|r| (r.created_at, r.id));
        rows.into_iter().map(|r| self.resolve(r)).collect()
    }

    fn active_items(&self, cart_id: Uuid) -> StoreResult<Vec<Item>> {
        self.items_where(|r| r.cart_id == cart_id && !r.ordered)
    }

    fn order(&self, row: &OrderRow) -> StoreResult<Order> {
        Ok(Order {
            id: row.id, user_id: row.user_id, items: self.items_where(|r| r.order_id == Some(row.id))?,
            total: row.total, status: row.status, created_at: row.created_at,
        })
    }

    fn order_by_id(&self, order_id: Uuid) -> StoreResult<Option<Order>> {
        self.orders.iter().find(|o| o.id == order_id).map(|o| self.order(o)).transpose()
    }

    fn set_cart_total(&mut self, cart_id: Uuid, total: Decimal) {
        if let Some(cart) = self.carts.iter_mut().find(|c| c.id == cart_id) { cart.total = total; }
    }

    fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
        if self.orders.iter().any(|o| o.id == order.id) { return Err(StoreError::UniqueViolation(format!("order {}", order.id))); }
        if !self.users.iter().any(|u| u.id == order.user_id) { return Err(StoreError::ForeignKeyViolation(format!("user {}", order.user_id))); }
        self.orders.push(OrderRow { id: order.id, user_id: order.user_id, total: order.total, status: order.status, created_at: order.created_at });
        Ok(())
    }

    fn claim_items(&mut self, order_id: Uuid, item_ids: &[Uuid]) -> u64 {
        let mut claimed = 0;
        for row in self.items.iter_mut().filter(|r| !r.ordered && item_ids.contains(&r.id)) {
            row.order_id = Some(order_id);
            row.ordered = true;
            claimed += 1;
        }
        claimed
    }

    fn cancel_order(&mut self, order_id: Uuid) -> bool {
        match self.orders.iter_mut().find(|o| o.id == order_id && o.status == OrderStatus::Placed) {
            Some(o) => { o.status = OrderStatus::Canceled; true }
            None => false,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl Inventory for MemoryStore {
    async fn product_by_sku(&self, sku: &Sku) -> StoreResult<Option<Product>> {
        Ok(self.tables.lock().await.product_by_sku(sku))
    }

    async fn decrement_stock(&self, sku: &Sku, quantity: Quantity) -> StoreResult<bool> {
        Ok(self.tables.lock().await.decrement_stock(sku, quantity))
    }

    async fn increment_stock(&self, product_id: Uuid, quantity: Quantity) -> StoreResult<bool> {
        Ok(self.tables.lock().await.increment_stock(product_id, quantity))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_category(&self, category: &Category) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        if t.categories.iter().any(|c| c.name == category.name) { return Err(StoreError::UniqueViolation(format!("category {}", category.name))); }
        t.categories.push(category.clone());
        t.categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(())
    }

    async fn list_categories(&self, page: PageRequest) -> StoreResult<(Vec<Category>, u64)> {
        Ok(page_of(&self.tables.lock().await.categories, page))
    }

    async fn category_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
        Ok(self.tables.lock().await.categories.iter().find(|c| c.name == name).cloned())
    }

    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        if t.products.iter().any(|p| p.sku == product.sku) { return Err(StoreError::UniqueViolation(format!("sku {}", product.sku))); }
        t.products.push(product.clone());
        t.products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(())
    }

    async fn list_products(&self, page: PageRequest) -> StoreResult<(Vec<Product>, u64)> {
        Ok(page_of(&self.tables.lock().await.products, page))
    }

    async fn search_products(&self, name: &str) -> StoreResult<Vec<Product>> {
        let needle = name.to_lowercase();
        Ok(self.tables.lock().await.products.iter().filter(|p| p.name.to_lowercase().contains(&needle)).cloned().collect())
    }

    async fn update_product(&self, sku: &Sku, patch: &ProductPatch) -> StoreResult<Option<Product>> {
        let mut t = self.tables.lock().await;
        let Some(product) = t.products.iter_mut().find(|p| &p.sku == sku) else { return Ok(None) };
        patch.apply(product);
        let updated = product.clone();
        t.products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(Some(updated))
    }

    async fn delete_product(&self, sku: &Sku) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        let Some(product) = t.product_by_sku(sku) else { return Ok(false) };
        if t.items.iter().any(|i| i.product_id == product.id) { return Err(StoreError::ForeignKeyViolation(format!("product {sku}"))); }
        t.products.retain(|p| p.id != product.id);
        Ok(true)
    }

    async fn insert_user_with_cart(&self, user: &User, cart: &Cart) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        if t.users.iter().any(|u| u.email == user.email) { return Err(StoreError::UniqueViolation(format!("email {}", user.email))); }
        t.users.push(user.clone());
        t.carts.push(CartRow { id: cart.id, user_id: user.id, total: Decimal::ZERO });
        Ok(())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.tables.lock().await.users.iter().find(|u| u.email == email).cloned())
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.lock().await.users.iter().find(|u| u.id == id).cloned())
    }

    async fn cart_by_user(&self, user_id: Uuid) -> StoreResult<Option<Cart>> {
        Ok(self.tables.lock().await.carts.iter().find(|c| c.user_id == user_id)
            .map(|c| Cart { id: c.id, user_id: c.user_id, items: vec![], total: c.total }))
    }

    async fn active_items(&self, cart_id: Uuid) -> StoreResult<Vec<Item>> {
        self.tables.lock().await.active_items(cart_id)
    }

    async fn insert_item(&self, item: &Item, max_items: usize) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        if !t.carts.iter().any(|c| c.id == item.cart_id) { return Err(StoreError::ForeignKeyViolation(format!("cart {}", item.cart_id))); }
        if !t.products.iter().any(|p| p.id == item.product.id) { return Err(StoreError::ForeignKeyViolation(format!("product {}", item.product.id))); }
        if t.items.iter().filter(|r| r.cart_id == item.cart_id && !r.ordered).count() >= max_items {
            return Err(StoreError::CartFull(max_items));
        }
        if t.items.iter().any(|r| r.cart_id == item.cart_id && r.product_id == item.product.id && !r.ordered) {
            return Err(StoreError::UniqueViolation(format!("active item for product {} in cart {}", item.product.id, item.cart_id)));
        }
        t.items.push(ItemRow {
            id: item.id, cart_id: item.cart_id, product_id: item.product.id, order_id: None, quantity: item.quantity,
            line_total: item.line_total, ordered: false, created_at: item.created_at,
        });
        Ok(())
    }

    async fn update_item(&self, cart_id: Uuid, product_id: Uuid, quantity: Quantity, line_total: Decimal) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        match t.items.iter_mut().find(|r| r.cart_id == cart_id && r.product_id == product_id && !r.ordered) {
            Some(row) => { row.quantity = quantity; row.line_total = line_total; Ok(true) }
            None => Ok(false),
        }
    }

    async fn delete_item(&self, cart_id: Uuid, product_id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        let before = t.items.len();
        t.items.retain(|r| !(r.cart_id == cart_id && r.product_id == product_id && !r.ordered));
        Ok(t.items.len() != before)
    }

    async fn set_cart_total(&self, cart_id: Uuid, total: Decimal) -> StoreResult<()> {
        self.tables.lock().await.set_cart_total(cart_id, total);
        Ok(())
    }

    async fn order_by_id(&self, order_id: Uuid) -> StoreResult<Option<Order>> {
        self.tables.lock().await.order_by_id(order_id)
    }

    async fn orders_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<&OrderRow> = t.orders.iter().filter(|o| o.user_id == user_id).collect();
        rows.sort_by_key(|o| (o.created_at, o.id));
        rows.into_iter().map(|o| t.order(o)).collect()
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let working = Mutex::new(Tables::clone(&guard));
        Ok(Box::new(MemoryTx { guard, working }))
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    working: Mutex<Tables>,
}

#[async_trait]
impl Inventory for MemoryTx {
    async fn product_by_sku(&self, sku: &Sku) -> StoreResult<Option<Product>> {
        Ok(self.working.lock().await.product_by_sku(sku))
    }

    async fn decrement_stock(&self, sku: &Sku, quantity: Quantity) -> StoreResult<bool> {
        Ok(self.working.lock().await.decrement_stock(sku, quantity))
    }

    async fn increment_stock(&self, product_id: Uuid, quantity: Quantity) -> StoreResult<bool> {
        Ok(self.working.lock().await.increment_stock(product_id, quantity))
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn active_items(&self, cart_id: Uuid) -> StoreResult<Vec<Item>> {
        self.working.lock().await.active_items(cart_id)
    }

    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        self.working.lock().await.insert_order(order)
    }

    async fn claim_items(&self, order_id: Uuid, item_ids: &[Uuid]) -> StoreResult<u64> {
        Ok(self.working.lock().await.claim_items(order_id, item_ids))
    }

    async fn set_cart_total(&self, cart_id: Uuid, total: Decimal) -> StoreResult<()> {
        self.working.lock().await.set_cart_total(cart_id, total);
        Ok(())
    }

    async fn cancel_order(&self, order_id: Uuid) -> StoreResult<bool> {
        Ok(self.working.lock().await.cancel_order(order_id))
    }

    async fn order_by_id(&self, order_id: Uuid) -> StoreResult<Option<Order>> {
        self.working.lock().await.order_by_id(order_id)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working.into_inner();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(sku: &str, stock: u32) -> Product {
        Product::create(Sku::new(sku).unwrap(), sku, Decimal::from(10), stock, None, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_decrement_never_goes_negative() {
        let store = MemoryStore::new();
        let p = product("SKU1", 3);
        store.insert_product(&p).await.unwrap();
        assert!(store.decrement_stock(&p.sku, Quantity::new(2).unwrap()).await.unwrap());
        assert!(!store.decrement_stock(&p.sku, Quantity::new(2).unwrap()).await.unwrap());
        assert_eq!(store.product_by_sku(&p.sku).await.unwrap().unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = MemoryStore::new();
        let p = product("SKU1", 3);
        store.insert_product(&p).await.unwrap();
        {
            let tx = store.begin().await.unwrap();
            assert!(tx.decrement_stock(&p.sku, Quantity::new(3).unwrap()).await.unwrap());
            assert_eq!(tx.product_by_sku(&p.sku).await.unwrap().unwrap().stock, 0);
        }
        assert_eq!(store.product_by_sku(&p.sku).await.unwrap().unwrap().stock, 3);

        let tx = store.begin().await.unwrap();
        tx.decrement_stock(&p.sku, Quantity::new(1).unwrap()).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.product_by_sku(&p.sku).await.unwrap().unwrap().stock, 2);
    }

    #[tokio::test]
    async fn test_delete_referenced_product_is_refused() {
        let store = MemoryStore::new();
        let user = User::register("a@b.c", "h".into(), "A".into(), "B".into(), "1".into(), crate::domain::aggregates::Role::User, Utc::now());
        let cart = Cart::new(user.id);
        store.insert_user_with_cart(&user, &cart).await.unwrap();
        let p = product("SKU1", 3);
        store.insert_product(&p).await.unwrap();
        store.insert_item(&Item::new(cart.id, p.clone(), Quantity::new(1).unwrap(), Utc::now()).unwrap(), 20).await.unwrap();
        assert!(matches!(store.delete_product(&p.sku).await, Err(StoreError::ForeignKeyViolation(_))));
    }
}
