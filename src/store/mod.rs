//! Persistence seam.
//!
//! Every invariant that spans concurrent requests is enforced here, not in
//! the services: the one-active-item-per-product rule is a unique constraint,
//! stock decrements and item claims are conditional updates that report
//! whether they applied, and checkout/cancellation run inside a [`StoreTx`].

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, Category, Item, Order, Product, ProductPatch, User};
use crate::domain::value_objects::{Quantity, Sku};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("row is still referenced: {0}")]
    ForeignKeyViolation(String),

    #[error("cart already holds {0} active items")]
    CartFull(usize),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// 1-based page request, already clamped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub const DEFAULT_SIZE: u32 = 10;
    pub const MAX_SIZE: u32 = 100;

    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let page_size = match page_size { Some(0) | None => Self::DEFAULT_SIZE, Some(s) => s.min(Self::MAX_SIZE) };
        Self { page, page_size }
    }

    pub fn offset(&self) -> u64 { u64::from(self.page - 1) * u64::from(self.page_size) }
    pub fn limit(&self) -> u64 { u64::from(self.page_size) }
}

impl Default for PageRequest {
    fn default() -> Self { Self::new(None, None) }
}

/// Stock rows, reachable both outside and inside a transaction.
#[async_trait]
pub trait Inventory: Send + Sync {
    async fn product_by_sku(&self, sku: &Sku) -> StoreResult<Option<Product>>;

    /// `stock = stock - quantity` guarded by `stock >= quantity`.
    /// Returns `false` when no row matched (missing product or not enough stock).
    async fn decrement_stock(&self, sku: &Sku, quantity: Quantity) -> StoreResult<bool>;

    /// `stock = stock + quantity`. Returns `false` when the product is gone.
    async fn increment_stock(&self, product_id: Uuid, quantity: Quantity) -> StoreResult<bool>;
}

#[async_trait]
pub trait Store: Inventory {
    async fn insert_category(&self, category: &Category) -> StoreResult<()>;
    async fn list_categories(&self, page: PageRequest) -> StoreResult<(Vec<Category>, u64)>;
    async fn category_by_name(&self, name: &str) -> StoreResult<Option<Category>>;

    async fn insert_product(&self, product: &Product) -> StoreResult<()>;
    async fn list_products(&self, page: PageRequest) -> StoreResult<(Vec<Product>, u64)>;
    /// Case-insensitive substring match on the product name, ordered by name.
    async fn search_products(&self, name: &str) -> StoreResult<Vec<Product>>;
    async fn update_product(&self, sku: &Sku, patch: &ProductPatch) -> StoreResult<Option<Product>>;
    async fn delete_product(&self, sku: &Sku) -> StoreResult<bool>;

    /// Creates the user together with their (empty) cart.
    async fn insert_user_with_cart(&self, user: &User, cart: &Cart) -> StoreResult<()>;
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// The cart row only; `items` is left empty.
    async fn cart_by_user(&self, user_id: Uuid) -> StoreResult<Option<Cart>>;
    /// Active items in insertion order, each with its current product.
    async fn active_items(&self, cart_id: Uuid) -> StoreResult<Vec<Item>>;
    /// Inserts an active item unless the cart already holds `max_items` of them
    /// ([`StoreError::CartFull`]) or one for the same product
    /// ([`StoreError::UniqueViolation`]). The count and the insert are atomic.
    async fn insert_item(&self, item: &Item, max_items: usize) -> StoreResult<()>;
    /// Updates an active item in place. Returns `false` when no active item matched.
    async fn update_item(&self, cart_id: Uuid, product_id: Uuid, quantity: Quantity, line_total: Decimal) -> StoreResult<bool>;
    /// Hard-deletes an active item. Returns `false` when no active item matched.
    async fn delete_item(&self, cart_id: Uuid, product_id: Uuid) -> StoreResult<bool>;
    async fn set_cart_total(&self, cart_id: Uuid, total: Decimal) -> StoreResult<()>;

    async fn order_by_id(&self, order_id: Uuid) -> StoreResult<Option<Order>>;
    /// All orders of a user, oldest first, any status.
    async fn orders_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>>;

    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;
}

/// Unit of work. Dropping it without [`StoreTx::commit`] rolls everything back.
#[async_trait]
pub trait StoreTx: Inventory {
    async fn active_items(&self, cart_id: Uuid) -> StoreResult<Vec<Item>>;
    /// Inserts the order row; items are linked later by [`StoreTx::claim_items`].
    async fn insert_order(&self, order: &Order) -> StoreResult<()>;
    /// Marks the given active items as ordered by `order_id`. Returns how many were claimed.
    async fn claim_items(&self, order_id: Uuid, item_ids: &[Uuid]) -> StoreResult<u64>;
    async fn set_cart_total(&self, cart_id: Uuid, total: Decimal) -> StoreResult<()>;
    /// placed → canceled. Returns `false` when the order was not in `placed`.
    async fn cancel_order(&self, order_id: Uuid) -> StoreResult<bool>;
    async fn order_by_id(&self, order_id: Uuid) -> StoreResult<Option<Order>>;
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps() {
        assert_eq!(PageRequest::new(None, None), PageRequest { page: 1, page_size: 10 });
        assert_eq!(PageRequest::new(Some(0), Some(500)), PageRequest { page: 1, page_size: 100 });
        assert_eq!(PageRequest::new(Some(3), Some(20)).offset(), 40);
    }
}
