//! PostgreSQL store.
//!
//! Row-level conditional updates carry the concurrency guarantees: the stock
//! decrement is guarded by `stock >= $n`, item claims only touch rows that are
//! still active, and the checkout transaction locks the active item rows it
//! reads so that a second checkout of the same cart sees them already ordered.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, PgConnection, Postgres, Transaction};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Inventory, PageRequest, Store, StoreError, StoreResult, StoreTx};
use crate::domain::aggregates::{Cart, Category, Item, Order, OrderStatus, Product, ProductPatch, Role, User};
use crate::domain::value_objects::{Quantity, Sku};

const PRODUCT_COLUMNS: &str = "id, name, price, sku, stock, category, created_at";

const ITEM_SELECT: &str = "SELECT i.id, i.cart_id, i.order_id, i.quantity, i.line_total, i.is_ordered, i.created_at, \
     p.id AS product_id, p.name AS product_name, p.price AS product_price, p.sku AS product_sku, \
     p.stock AS product_stock, p.category AS product_category, p.created_at AS product_created_at \
     FROM items i JOIN products p ON p.id = i.product_id";

fn map_db_error(err: sqlx::Error) -> StoreError {
    if let Some(db) = err.as_database_error() {
        let constraint = db.constraint().unwrap_or("unnamed").to_string();
        if db.is_unique_violation() { return StoreError::UniqueViolation(constraint); }
        if db.is_foreign_key_violation() { return StoreError::ForeignKeyViolation(constraint); }
    }
    StoreError::Database(err)
}

fn to_i32(value: u32, what: &str) -> StoreResult<i32> {
    i32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{what} {value} does not fit the column")))
}

fn to_u32(value: i32, what: &str) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {what} {value}")))
}

fn to_sku(value: String) -> StoreResult<Sku> {
    Sku::new(value).map_err(|e| StoreError::Corrupt(e.to_string()))
}

#[derive(FromRow)]
struct ProductRow { id: Uuid, name: String, price: Decimal, sku: String, stock: i32, category: Option<String>, created_at: DateTime<Utc> }

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;
    fn try_from(r: ProductRow) -> StoreResult<Self> {
        Ok(Product { id: r.id, name: r.name, price: r.price, sku: to_sku(r.sku)?, stock: to_u32(r.stock, "stock")?, category: r.category, created_at: r.created_at })
    }
}

#[derive(FromRow)]
struct CategoryRow { id: Uuid, name: String, description: String, created_at: DateTime<Utc> }

impl From<CategoryRow> for Category {
    fn from(r: CategoryRow) -> Self { Category { id: r.id, name: r.name, description: r.description, created_at: r.created_at } }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    zip_code: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;
    fn try_from(r: UserRow) -> StoreResult<Self> {
        let role = r.role.parse::<Role>().map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Ok(User {
            id: r.id, email: r.email, password_hash: r.password_hash, first_name: r.first_name,
            last_name: r.last_name, zip_code: r.zip_code, role, created_at: r.created_at,
        })
    }
}

#[derive(FromRow)]
struct ItemRow {
    id: Uuid,
    cart_id: Uuid,
    order_id: Option<Uuid>,
    quantity: i32,
    line_total: Decimal,
    is_ordered: bool,
    created_at: DateTime<Utc>,
    product_id: Uuid,
    product_name: String,
    product_price: Decimal,
    product_sku: String,
    product_stock: i32,
    product_category: Option<String>,
    product_created_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for Item {
    type Error = StoreError;
    fn try_from(r: ItemRow) -> StoreResult<Self> {
        let product = ProductRow {
            id: r.product_id, name: r.product_name, price: r.product_price, sku: r.product_sku,
            stock: r.product_stock, category: r.product_category, created_at: r.product_created_at,
        };
        let quantity = Quantity::new(to_u32(r.quantity, "quantity")?).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Ok(Item {
            id: r.id, cart_id: r.cart_id, order_id: r.order_id, product: product.try_into()?, quantity,
            line_total: r.line_total, ordered: r.is_ordered, created_at: r.created_at,
        })
    }
}

#[derive(FromRow)]
struct OrderRow { id: Uuid, user_id: Uuid, total: Decimal, status: String, created_at: DateTime<Utc> }

impl OrderRow {
    fn into_order(self, items: Vec<Item>) -> StoreResult<Order> {
        let status = self.status.parse::<OrderStatus>().map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Ok(Order { id: self.id, user_id: self.user_id, items, total: self.total, status, created_at: self.created_at })
    }
}

// Queries shared by the pooled store and the transaction.

async fn product_by_sku(conn: &mut PgConnection, sku: &Sku) -> StoreResult<Option<Product>> {
    let row: Option<ProductRow> = sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = $1"))
        .bind(sku.as_str()).fetch_optional(conn).await?;
    row.map(Product::try_from).transpose()
}

async fn decrement_stock(conn: &mut PgConnection, sku: &Sku, quantity: Quantity) -> StoreResult<bool> {
    let done = sqlx::query("UPDATE products SET stock = stock - $2 WHERE sku = $1 AND stock >= $2")
        .bind(sku.as_str()).bind(to_i32(quantity.get(), "quantity")?).execute(conn).await?;
    Ok(done.rows_affected() == 1)
}

async fn increment_stock(conn: &mut PgConnection, product_id: Uuid, quantity: Quantity) -> StoreResult<bool> {
    let done = sqlx::query("UPDATE products SET stock = LEAST(stock::BIGINT + $2, 2147483647)::INTEGER WHERE id = $1")
        .bind(product_id).bind(i64::from(quantity.get())).execute(conn).await?;
    Ok(done.rows_affected() == 1)
}

async fn active_items(conn: &mut PgConnection, cart_id: Uuid, lock: bool) -> StoreResult<Vec<Item>> {
    let lock = if lock { " FOR UPDATE OF i" } else { "" };
    let rows: Vec<ItemRow> = sqlx::query_as(&format!("{ITEM_SELECT} WHERE i.cart_id = $1 AND NOT i.is_ordered ORDER BY i.created_at, i.id{lock}"))
        .bind(cart_id).fetch_all(conn).await?;
    rows.into_iter().map(Item::try_from).collect()
}

async fn set_cart_total(conn: &mut PgConnection, cart_id: Uuid, total: Decimal) -> StoreResult<()> {
    sqlx::query("UPDATE carts SET total = $2 WHERE id = $1").bind(cart_id).bind(total).execute(conn).await?;
    Ok(())
}

async fn items_of_orders(conn: &mut PgConnection, order_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Vec<Item>>> {
    let rows: Vec<ItemRow> = sqlx::query_as(&format!("{ITEM_SELECT} WHERE i.order_id = ANY($1) ORDER BY i.created_at, i.id"))
        .bind(order_ids).fetch_all(conn).await?;
    let mut grouped: HashMap<Uuid, Vec<Item>> = HashMap::new();
    for row in rows {
        let item = Item::try_from(row)?;
        if let Some(order_id) = item.order_id { grouped.entry(order_id).or_default().push(item); }
    }
    Ok(grouped)
}

async fn order_by_id(conn: &mut PgConnection, order_id: Uuid) -> StoreResult<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as("SELECT id, user_id, total, status, created_at FROM orders WHERE id = $1")
        .bind(order_id).fetch_optional(&mut *conn).await?;
    let Some(row) = row else { return Ok(None) };
    let items = items_of_orders(conn, &[order_id]).await?.remove(&order_id).unwrap_or_default();
    row.into_order(items).map(Some)
}

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Inventory for PgStore {
    async fn product_by_sku(&self, sku: &Sku) -> StoreResult<Option<Product>> {
        product_by_sku(&mut *self.pool.acquire().await?, sku).await
    }

    async fn decrement_stock(&self, sku: &Sku, quantity: Quantity) -> StoreResult<bool> {
        decrement_stock(&mut *self.pool.acquire().await?, sku, quantity).await
    }

    async fn increment_stock(&self, product_id: Uuid, quantity: Quantity) -> StoreResult<bool> {
        increment_stock(&mut *self.pool.acquire().await?, product_id, quantity).await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_category(&self, category: &Category) -> StoreResult<()> {
        sqlx::query("INSERT INTO categories (id, name, description, created_at) VALUES ($1, $2, $3, $4)")
            .bind(category.id).bind(&category.name).bind(&category.description).bind(category.created_at)
            .execute(&self.pool).await.map_err(map_db_error)?;
        Ok(())
    }

    async fn list_categories(&self, page: PageRequest) -> StoreResult<(Vec<Category>, u64)> {
        let rows: Vec<CategoryRow> = sqlx::query_as("SELECT id, name, description, created_at FROM categories ORDER BY name LIMIT $1 OFFSET $2")
            .bind(page.limit() as i64).bind(page.offset() as i64).fetch_all(&self.pool).await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories").fetch_one(&self.pool).await?;
        Ok((rows.into_iter().map(Category::from).collect(), total as u64))
    }

    async fn category_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
        let row: Option<CategoryRow> = sqlx::query_as("SELECT id, name, description, created_at FROM categories WHERE name = $1")
            .bind(name).fetch_optional(&self.pool).await?;
        Ok(row.map(Category::from))
    }

    async fn insert_product(&self, p: &Product) -> StoreResult<()> {
        sqlx::query(&format!("INSERT INTO products ({PRODUCT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"))
            .bind(p.id).bind(&p.name).bind(p.price).bind(p.sku.as_str()).bind(to_i32(p.stock, "stock")?).bind(&p.category).bind(p.created_at)
            .execute(&self.pool).await.map_err(map_db_error)?;
        Ok(())
    }

    async fn list_products(&self, page: PageRequest) -> StoreResult<(Vec<Product>, u64)> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name, id LIMIT $1 OFFSET $2"))
            .bind(page.limit() as i64).bind(page.offset() as i64).fetch_all(&self.pool).await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products").fetch_one(&self.pool).await?;
        Ok((rows.into_iter().map(Product::try_from).collect::<StoreResult<_>>()?, total as u64))
    }

    async fn search_products(&self, name: &str) -> StoreResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE strpos(lower(name), lower($1)) > 0 ORDER BY name, id"))
            .bind(name).fetch_all(&self.pool).await?;
        rows.into_iter().map(Product::try_from).collect()
    }

    async fn update_product(&self, sku: &Sku, patch: &ProductPatch) -> StoreResult<Option<Product>> {
        let stock = patch.stock.map(|s| to_i32(s, "stock")).transpose()?;
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "UPDATE products SET name = COALESCE($2, name), price = COALESCE($3, price), stock = COALESCE($4, stock), \
             category = COALESCE($5, category) WHERE sku = $1 RETURNING {PRODUCT_COLUMNS}"))
            .bind(sku.as_str()).bind(&patch.name).bind(patch.price).bind(stock).bind(&patch.category)
            .fetch_optional(&self.pool).await?;
        row.map(Product::try_from).transpose()
    }

    async fn delete_product(&self, sku: &Sku) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM products WHERE sku = $1").bind(sku.as_str())
            .execute(&self.pool).await.map_err(map_db_error)?;
        Ok(done.rows_affected() == 1)
    }

    async fn insert_user_with_cart(&self, user: &User, cart: &Cart) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO users (id, email, password_hash, first_name, last_name, zip_code, role, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)")
            .bind(user.id).bind(&user.email).bind(&user.password_hash).bind(&user.first_name).bind(&user.last_name)
            .bind(&user.zip_code).bind(user.role.as_str()).bind(user.created_at)
            .execute(&mut *tx).await.map_err(map_db_error)?;
        sqlx::query("INSERT INTO carts (id, user_id, total) VALUES ($1, $2, 0)")
            .bind(cart.id).bind(user.id).execute(&mut *tx).await.map_err(map_db_error)?;
        tx.commit().await?;
        Ok(())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT id, email, password_hash, first_name, last_name, zip_code, role, created_at FROM users WHERE email = $1")
            .bind(email).fetch_optional(&self.pool).await?;
        row.map(User::try_from).transpose()
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT id, email, password_hash, first_name, last_name, zip_code, role, created_at FROM users WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?;
        row.map(User::try_from).transpose()
    }

    async fn cart_by_user(&self, user_id: Uuid) -> StoreResult<Option<Cart>> {
        let row: Option<(Uuid, Uuid, Decimal)> = sqlx::query_as("SELECT id, user_id, total FROM carts WHERE user_id = $1")
            .bind(user_id).fetch_optional(&self.pool).await?;
        Ok(row.map(|(id, user_id, total)| Cart { id, user_id, items: vec![], total }))
    }

    async fn active_items(&self, cart_id: Uuid) -> StoreResult<Vec<Item>> {
        active_items(&mut *self.pool.acquire().await?, cart_id, false).await
    }

    async fn insert_item(&self, item: &Item, max_items: usize) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        // the cart row lock serializes concurrent adds to one cart
        let locked: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM carts WHERE id = $1 FOR UPDATE")
            .bind(item.cart_id).fetch_optional(&mut *tx).await?;
        if locked.is_none() {
            return Err(StoreError::ForeignKeyViolation(format!("cart {}", item.cart_id)));
        }
        let (active,): (i64,) = sqlx::query_as("SELECT count(*) FROM items WHERE cart_id = $1 AND NOT is_ordered")
            .bind(item.cart_id).fetch_one(&mut *tx).await?;
        if usize::try_from(active).unwrap_or(usize::MAX) >= max_items {
            return Err(StoreError::CartFull(max_items));
        }
        sqlx::query("INSERT INTO items (id, cart_id, product_id, quantity, line_total, is_ordered, created_at) VALUES ($1, $2, $3, $4, $5, FALSE, $6)")
            .bind(item.id).bind(item.cart_id).bind(item.product.id).bind(to_i32(item.quantity.get(), "quantity")?)
            .bind(item.line_total).bind(item.created_at)
            .execute(&mut *tx).await.map_err(map_db_error)?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_item(&self, cart_id: Uuid, product_id: Uuid, quantity: Quantity, line_total: Decimal) -> StoreResult<bool> {
        let done = sqlx::query("UPDATE items SET quantity = $3, line_total = $4 WHERE cart_id = $1 AND product_id = $2 AND NOT is_ordered")
            .bind(cart_id).bind(product_id).bind(to_i32(quantity.get(), "quantity")?).bind(line_total)
            .execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn delete_item(&self, cart_id: Uuid, product_id: Uuid) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM items WHERE cart_id = $1 AND product_id = $2 AND NOT is_ordered")
            .bind(cart_id).bind(product_id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn set_cart_total(&self, cart_id: Uuid, total: Decimal) -> StoreResult<()> {
        set_cart_total(&mut *self.pool.acquire().await?, cart_id, total).await
    }

    async fn order_by_id(&self, order_id: Uuid) -> StoreResult<Option<Order>> {
        order_by_id(&mut *self.pool.acquire().await?, order_id).await
    }

    async fn orders_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<OrderRow> = sqlx::query_as("SELECT id, user_id, total, status, created_at FROM orders WHERE user_id = $1 ORDER BY created_at, id")
            .bind(user_id).fetch_all(&mut *conn).await?;
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items = items_of_orders(&mut conn, &ids).await?;
        rows.into_iter().map(|r| { let its = items.remove(&r.id).unwrap_or_default(); r.into_order(its) }).collect()
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        Ok(Box::new(PgTx { tx: Mutex::new(self.pool.begin().await?) }))
    }
}

struct PgTx {
    tx: Mutex<Transaction<'static, Postgres>>,
}

#[async_trait]
impl Inventory for PgTx {
    async fn product_by_sku(&self, sku: &Sku) -> StoreResult<Option<Product>> {
        product_by_sku(&mut **self.tx.lock().await, sku).await
    }

    async fn decrement_stock(&self, sku: &Sku, quantity: Quantity) -> StoreResult<bool> {
        decrement_stock(&mut **self.tx.lock().await, sku, quantity).await
    }

    async fn increment_stock(&self, product_id: Uuid, quantity: Quantity) -> StoreResult<bool> {
        increment_stock(&mut **self.tx.lock().await, product_id, quantity).await
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn active_items(&self, cart_id: Uuid) -> StoreResult<Vec<Item>> {
        active_items(&mut **self.tx.lock().await, cart_id, true).await
    }

    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        let mut tx = self.tx.lock().await;
        sqlx::query("INSERT INTO orders (id, user_id, total, status, created_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(order.id).bind(order.user_id).bind(order.total).bind(order.status.as_str()).bind(order.created_at)
            .execute(&mut **tx).await.map_err(map_db_error)?;
        Ok(())
    }

    async fn claim_items(&self, order_id: Uuid, item_ids: &[Uuid]) -> StoreResult<u64> {
        let mut tx = self.tx.lock().await;
        let done = sqlx::query("UPDATE items SET order_id = $1, is_ordered = TRUE WHERE id = ANY($2) AND NOT is_ordered")
            .bind(order_id).bind(item_ids).execute(&mut **tx).await?;
        Ok(done.rows_affected())
    }

    async fn set_cart_total(&self, cart_id: Uuid, total: Decimal) -> StoreResult<()> {
        set_cart_total(&mut **self.tx.lock().await, cart_id, total).await
    }

    async fn cancel_order(&self, order_id: Uuid) -> StoreResult<bool> {
        let mut tx = self.tx.lock().await;
        let done = sqlx::query("UPDATE orders SET status = 'canceled' WHERE id = $1 AND status = 'placed'")
            .bind(order_id).execute(&mut **tx).await?;
        Ok(done.rows_affected() == 1)
    }

    async fn order_by_id(&self, order_id: Uuid) -> StoreResult<Option<Order>> {
        order_by_id(&mut **self.tx.lock().await, order_id).await
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.into_inner().commit().await?;
        Ok(())
    }
}
